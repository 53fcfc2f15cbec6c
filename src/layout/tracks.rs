/// Distance from a macro corner to the first usable track, in minimum pitches.
pub const EDGE_OFFSET_TRACKS: i64 = 6;

/// Number of pin tracks that fit along an edge of length `edge_length_nm`,
/// leaving [`EDGE_OFFSET_TRACKS`] pitches clear at each end.
pub fn available_tracks(edge_length_nm: i64, pitch_nm: i64) -> usize {
    let usable = edge_length_nm - 2 * EDGE_OFFSET_TRACKS * pitch_nm;
    if usable <= 0 || pitch_nm <= 0 {
        0
    } else {
        (usable / pitch_nm) as usize
    }
}

/// The largest `m` such that `pins * m <= available`.
///
/// Returns `None` if even a multiplier of 1 does not fit. An edge without
/// pins uses a multiplier of 1.
pub fn track_multiplier(pins: usize, available: usize) -> Option<usize> {
    match pins {
        0 => Some(1),
        n if n > available => None,
        n => Some(available / n),
    }
}

/// Spare tracks left on an edge, split evenly among its pin groups.
pub fn group_spacing_tracks(pins: usize, multiplier: usize, available: usize, groups: usize) -> usize {
    if groups == 0 {
        return 0;
    }
    available.saturating_sub(pins * multiplier) / groups
}
