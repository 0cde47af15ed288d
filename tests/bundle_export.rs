use scene_translator::{
    export_scene, load_scene_bundle, load_scene_bundle_from_bytes, write_manifest, ExportOptions,
    SceneNodeKind,
};
use std::fs;
use std::io::Write;

const SCENE: &str = r#"{
    "name": "workshop",
    "start_frame": 0,
    "end_frame": 10,
    "nodes": [
        { "name": "Floor", "kind": { "type": "mesh", "surface": 1, "mesh": {
            "positions": [[0,0,0],[1000,0,0],[1000,0,1000],[0,0,1000]],
            "face_vertex_counts": [4],
            "face_indices": [0,1,2,3],
            "normals": [[0,1,0],[0,1,0],[0,1,0],[0,1,0]],
            "uv0": [[0,0],[1,0],[1,1],[0,1]]
        } } },
        { "name": "Wall", "handle": 3, "kind": { "type": "mesh", "surface": 2, "mesh": {
            "positions": [[0,0,0],[1000,0,0],[1000,1000,0]],
            "face_vertex_counts": [3],
            "face_indices": [0,1,2]
        } } },
        { "name": "Wall Copy", "kind": { "type": "instance", "target": 3 } },
        { "name": "Hip", "kind": { "type": "joint", "kind": "bone", "handle": 1, "motion": {
            "keys": [ { "frame": 0 }, { "frame": 10, "rotation": [0, 0, 90] } ]
        } }, "children": [
            { "name": "Knee", "kind": { "type": "joint", "kind": "bone", "handle": 2 } }
        ] }
    ],
    "surfaces": [
        { "id": 1, "name": "Wood", "layers": [ { "kind": "diffuse", "image": 1 } ] },
        { "id": 2, "name": "Faded", "layers": [ { "kind": "diffuse", "image": 1, "weight": 0.5 } ] }
    ],
    "bitmaps": [ { "id": 1, "name": "wood", "file": "textures/wood.png" } ]
}"#;

fn wood_png() -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(4, 4, image::Rgba([150, 100, 50, 255]));
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

#[test]
fn test_directory_bundle_to_manifest() {
    let bundle = tempfile::tempdir().unwrap();
    let png = wood_png();
    fs::create_dir_all(bundle.path().join("textures")).unwrap();
    fs::write(bundle.path().join("textures/wood.png"), &png).unwrap();
    fs::write(bundle.path().join("scene.json"), SCENE).unwrap();

    let scene = load_scene_bundle(bundle.path()).unwrap();
    let output = export_scene(&scene, &ExportOptions::default());

    assert_eq!(output.mesh_count(), 2);
    assert_eq!(output.total_faces(), 2);
    assert_eq!(output.materials.len(), 2);
    assert!(output.warnings.is_empty(), "{:?}", output.warnings);

    // The plain layer reuses the bitmap, the half-weight layer is baked.
    assert_eq!(output.images.len(), 2);
    assert!(output.images[0].is_passthrough());
    assert_eq!(output.images[0].file_name, "wood.png");
    assert!(!output.images[1].is_passthrough());

    let floor = output.node("/Root/Floor").unwrap().mesh().unwrap();
    assert_eq!(floor.positions[2], [100.0, 0.0, 100.0]);
    assert_eq!(floor.uv0.len(), 4);

    assert_eq!(
        output.node("/Root/Wall_Copy").unwrap().kind,
        SceneNodeKind::Reference {
            target: "/Root/Wall".to_string(),
            material_override: None,
        }
    );

    assert_eq!(output.skeletons.len(), 1);
    assert_eq!(output.skeletons[0].frames, vec![0.0, 10.0]);
    assert_eq!(output.skeletons[0].joints[1].name, "Hip/Knee");
    let hip = &output.skeletons[0].joints[0].tracks;
    assert!((hip.rotation[1].euler.z - 90.0).abs() < 1e-3);

    let out = tempfile::tempdir().unwrap();
    let manifest = write_manifest(&output, &scene, out.path()).unwrap();
    assert_eq!(fs::read(out.path().join("textures/wood.png")).unwrap(), png);
    let baked = out.path().join("textures").join(&output.images[1].file_name);
    let decoded = image::open(baked).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (4, 4));

    let json: serde_json::Value = serde_json::from_slice(&fs::read(manifest).unwrap()).unwrap();
    assert_eq!(json["scene"], "workshop");
    assert_eq!(json["nodes"][0]["path"], "/Root");
    assert_eq!(json["materials"][0]["name"], "/Root/Materials/Wood");
}

#[test]
fn test_zip_bundle_with_missing_bitmap() {
    let mut bytes = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut bytes));
        let options = zip::write::SimpleFileOptions::default();
        zip.start_file("scene.json", options).unwrap();
        zip.write_all(SCENE.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    let scene = load_scene_bundle_from_bytes(&bytes).unwrap();
    let output = export_scene(&scene, &ExportOptions::default());

    // Both surfaces still produce materials, without textures.
    assert_eq!(output.materials.len(), 2);
    assert!(output.images.is_empty());
    assert!(output.materials.iter().all(|m| !m.has_textures()));
    assert_eq!(output.warnings.len(), 1);
}
