use std::path::Path;

use anyhow::anyhow;
use lef21::{
    LefDbuPerMicron, LefDecimal, LefGeometry, LefLayerGeometries, LefLayerGeometriesBuilder,
    LefLibrary, LefLibraryBuilder, LefMacroBuilder, LefMacroClass, LefPin, LefPinDirection,
    LefPinShape, LefPinUse, LefPoint, LefPortBuilder, LefPortClass, LefShape, LefSymmetry,
    LefUnits,
};

use crate::config::MemoryRequest;
use crate::layout::{PinDirection, PinLayoutPlan, Rect};
use crate::Result;

pub const DB_PER_MICRON: u32 = 1000;

/// Builds the abstract view of a macro from its pin layout.
pub fn generate_lef(request: &MemoryRequest, plan: &PinLayoutPlan) -> Result<LefLibrary> {
    let mut pins = plan
        .pins
        .iter()
        .map(|pin| {
            export_pin(ExportPin {
                layer_name: &pin.layer,
                pin_name: pin.name.clone(),
                rects: std::slice::from_ref(&pin.rect),
                direction: match pin.direction {
                    PinDirection::Input => LefPinDirection::Input,
                    PinDirection::Output => LefPinDirection::Output { tristate: false },
                },
                use_: LefPinUse::Signal,
                shape: Some(LefPinShape::Abutment),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let supply = &plan.supply;
    pins.push(export_pin(ExportPin {
        layer_name: &supply.layer,
        pin_name: "VSS".to_string(),
        rects: &supply.vss,
        direction: LefPinDirection::Inout,
        use_: LefPinUse::Ground,
        shape: None,
    })?);
    pins.push(export_pin(ExportPin {
        layer_name: &supply.layer,
        pin_name: "VDD".to_string(),
        rects: &supply.vdd,
        direction: LefPinDirection::Inout,
        use_: LefPinUse::Power,
        shape: None,
    })?);

    let obs = plan
        .obstructions
        .iter()
        .map(|o| export_layer(&o.layer, std::slice::from_ref(&o.rect)))
        .collect::<Result<Vec<_>>>()?;

    // macro is a reserved keyword in Rust
    let makro = LefMacroBuilder::default()
        .name(request.name.as_str())
        .class(LefMacroClass::Block { tp: None })
        .pins(pins)
        .obs(obs)
        .size((export_decimal(plan.width_nm), export_decimal(plan.height_nm)))
        .symmetry([LefSymmetry::X, LefSymmetry::Y, LefSymmetry::R90])
        .build()?;

    let units = LefUnits {
        database_microns: Some(LefDbuPerMicron(DB_PER_MICRON)),
        ..Default::default()
    };

    Ok(LefLibraryBuilder::default()
        .macros([makro])
        .bus_bit_chars(('[', ']'))
        .divider_char('/')
        .units(units)
        .vias(lef21::Unsupported)
        .sites([])
        .build()?)
}

pub fn render_lef(request: &MemoryRequest, plan: &PinLayoutPlan) -> Result<String> {
    generate_lef(request, plan)?
        .to_string()
        .map_err(|e| anyhow!("failed to serialize LEF for {}: {e:?}", request.name))
}

pub fn save_lef(path: impl AsRef<Path>, request: &MemoryRequest, plan: &PinLayoutPlan) -> Result<()> {
    let lef = render_lef(request, plan)?;

    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, lef)?;

    Ok(())
}

fn export_rect(r: &Rect) -> LefShape {
    LefShape::Rect(
        LefPoint::new(export_decimal(r.x0), export_decimal(r.y0)),
        LefPoint::new(export_decimal(r.x1), export_decimal(r.y1)),
    )
}

/// Converts nanometers to microns with three decimal places.
fn export_decimal(nm: i64) -> LefDecimal {
    LefDecimal::new(nm, 3)
}

fn export_layer(layer_name: &str, rects: &[Rect]) -> Result<LefLayerGeometries> {
    Ok(LefLayerGeometriesBuilder::default()
        .layer_name(layer_name)
        .geometries(
            rects
                .iter()
                .map(|r| LefGeometry::Shape(export_rect(r)))
                .collect::<Vec<_>>(),
        )
        .vias([])
        .build()?)
}

struct ExportPin<'a> {
    layer_name: &'a str,
    pin_name: String,
    rects: &'a [Rect],
    direction: LefPinDirection,
    use_: LefPinUse,
    shape: Option<LefPinShape>,
}

fn export_pin(pin_info: ExportPin<'_>) -> Result<LefPin> {
    let ExportPin {
        layer_name,
        pin_name,
        rects,
        direction,
        use_,
        shape,
    } = pin_info;
    let port = LefPortBuilder::default()
        .class(LefPortClass::None)
        .layers(vec![export_layer(layer_name, rects)?])
        .build()?;

    Ok(LefPin {
        name: pin_name,
        ports: vec![port],
        direction: Some(direction),
        use_: Some(use_),
        shape,
        ..Default::default()
    })
}
