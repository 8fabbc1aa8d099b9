use std::env;
use std::path::Path;

use vista_core::portal::PortalAnchor;

const DEFAULT_SCALE: f32 = 10.0;
const DEFAULT_PORTAL_MATERIAL: usize = 4;

fn main() {
    let mut args = env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("Usage: anchor_inspector <path/to/model.obj> [scale] [portal_material]");
        std::process::exit(2);
    };

    let options = match parse_options(args.next(), args.next()) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("anchor_inspector error: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = run(Path::new(&path), options) {
        eprintln!("anchor_inspector error: {err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Options {
    scale: f32,
    portal_material: usize,
}

fn parse_options(scale: Option<String>, portal_material: Option<String>) -> Result<Options, String> {
    let scale = match scale {
        Some(raw) => raw
            .parse::<f32>()
            .map_err(|err| format!("invalid scale {raw:?}: {err}"))?,
        None => DEFAULT_SCALE,
    };
    let portal_material = match portal_material {
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|err| format!("invalid material index {raw:?}: {err}"))?,
        None => DEFAULT_PORTAL_MATERIAL,
    };
    Ok(Options {
        scale,
        portal_material,
    })
}

fn run(path: &Path, options: Options) -> Result<(), String> {
    let (models, materials) = tobj::load_obj(path, &tobj::GPU_LOAD_OPTIONS)
        .map_err(|err| format!("failed to load {}: {err}", path.display()))?;
    let materials = materials.unwrap_or_default();

    println!("Model: {}", path.display());
    println!("Meshes: {}", models.len());
    for (index, model) in models.iter().enumerate() {
        let material = match model.mesh.material_id {
            Some(id) => {
                let name = materials.get(id).map_or("?", |material| material.name.as_str());
                format!("{id} ({name})")
            }
            None => "none".to_string(),
        };
        println!(
            "  mesh {index} {:?}: {} vertices, {} triangles, material {material}",
            model.name,
            model.mesh.positions.len() / 3,
            model.mesh.indices.len() / 3,
        );
    }

    let portal = models
        .iter()
        .position(|model| model.mesh.material_id == Some(options.portal_material))
        .ok_or_else(|| format!("no mesh uses material {}", options.portal_material))?;
    let anchor = PortalAnchor::from_flat_positions(&models[portal].mesh.positions, options.scale)
        .map_err(|err| format!("mesh {portal}: {err}"))?;
    let position = anchor.position();

    println!(
        "Portal mesh {portal} anchor at scale {}: ({:.6}, {:.6}, {:.6})",
        options.scale, position.x, position.y, position.z
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_options, Options, DEFAULT_PORTAL_MATERIAL, DEFAULT_SCALE};

    #[test]
    fn options_default_to_client_values() {
        assert_eq!(
            parse_options(None, None),
            Ok(Options {
                scale: DEFAULT_SCALE,
                portal_material: DEFAULT_PORTAL_MATERIAL,
            })
        );
    }

    #[test]
    fn options_parse_and_reject_garbage() {
        assert_eq!(
            parse_options(Some("2.5".to_string()), Some("1".to_string())),
            Ok(Options {
                scale: 2.5,
                portal_material: 1,
            })
        );
        assert!(parse_options(Some("big".to_string()), None).is_err());
        assert!(parse_options(None, Some("-1".to_string())).is_err());
    }
}
