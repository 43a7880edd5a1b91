//! glTF 2.0 import into flat, GPU-ready CPU data.
//!
//! The default scene's node hierarchy is walked once and every node transform
//! is baked into its primitives, so the renderer draws each primitive with a
//! single model matrix (the model's root transform).

use crate::source::{AssetCache, AssetSource, fetch};
use crate::AssetError;
use base64::Engine;
use glam::{Mat3, Mat4, Vec3};
use serde::Serialize;

/// One drawable triangle list.
#[derive(Debug, Clone, Default)]
pub struct MeshPrimitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub indices: Vec<u32>,
    pub material: Option<usize>,
}

impl MeshPrimitive {
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AlphaMode {
    Opaque,
    Mask,
    Blend,
}

/// Metallic-roughness material. Texture fields index [`ModelData::images`].
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialData {
    pub name: String,
    pub base_color: [f32; 4],
    pub metallic: f32,
    pub roughness: f32,
    pub emissive: [f32; 3],
    pub occlusion_strength: f32,
    pub alpha_mode: AlphaMode,
    pub alpha_cutoff: f32,
    pub double_sided: bool,
    pub base_color_texture: Option<usize>,
    pub metallic_roughness_texture: Option<usize>,
    pub emissive_texture: Option<usize>,
    pub occlusion_texture: Option<usize>,
}

impl Default for MaterialData {
    fn default() -> Self {
        Self {
            name: "default".into(),
            base_color: [1.0, 1.0, 1.0, 1.0],
            metallic: 1.0,
            roughness: 1.0,
            emissive: [0.0; 3],
            occlusion_strength: 1.0,
            alpha_mode: AlphaMode::Opaque,
            alpha_cutoff: 0.5,
            double_sided: false,
            base_color_texture: None,
            metallic_roughness_texture: None,
            emissive_texture: None,
            occlusion_texture: None,
        }
    }
}

/// Decoded RGBA8 image.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Everything the renderer needs to draw a loaded model.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub name: String,
    pub primitives: Vec<MeshPrimitive>,
    pub materials: Vec<MaterialData>,
    pub images: Vec<ImageData>,
}

/// Printable overview of a model, see [`ModelData::summary`].
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub name: String,
    pub primitives: usize,
    pub vertices: usize,
    pub triangles: usize,
    pub materials: usize,
    pub images: usize,
    pub bounds_min: Option<[f32; 3]>,
    pub bounds_max: Option<[f32; 3]>,
}

impl ModelData {
    /// Fetch and import a model, resolving external buffers and images
    /// relative to `source`.
    pub fn load(source: &AssetSource, cache: Option<&AssetCache>) -> Result<Self, AssetError> {
        let bytes = fetch(source, cache)?;
        Self::import(&bytes, source, cache)
    }

    /// Import `.gltf` JSON or `.glb` bytes.
    pub fn import(
        bytes: &[u8],
        base: &AssetSource,
        cache: Option<&AssetCache>,
    ) -> Result<Self, AssetError> {
        let _span = tracing::info_span!("gltf_import", source = %base).entered();
        let gltf = gltf::Gltf::from_slice(bytes).map_err(|e| AssetError::GltfParse(e.to_string()))?;

        let buffers = load_buffers(&gltf, base, cache)?;
        let images = load_images(&gltf, &buffers, base, cache)?;
        let materials = gltf.materials().map(import_material).collect();

        let mut primitives = Vec::new();
        match gltf.default_scene().or_else(|| gltf.scenes().next()) {
            Some(scene) => {
                for node in scene.nodes() {
                    walk_node(&node, Mat4::IDENTITY, &buffers, &mut primitives);
                }
            }
            None => {
                // No scene: draw every mesh untransformed.
                for mesh in gltf.meshes() {
                    import_mesh(&mesh, Mat4::IDENTITY, &buffers, &mut primitives);
                }
            }
        }

        if primitives.is_empty() {
            return Err(AssetError::EmptyModel);
        }

        let name = gltf
            .default_scene()
            .and_then(|s| s.name().map(str::to_string))
            .unwrap_or_else(|| base.to_string());

        let model = Self {
            name,
            primitives,
            materials,
            images,
        };
        let summary = model.summary();
        tracing::info!(
            "imported model: {} primitives, {} vertices, {} triangles, {} materials",
            summary.primitives,
            summary.vertices,
            summary.triangles,
            summary.materials
        );
        Ok(model)
    }

    /// Axis-aligned bounds over all primitives.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut iter = self
            .primitives
            .iter()
            .flat_map(|p| p.positions.iter())
            .map(|p| Vec3::from_array(*p));
        let first = iter.next()?;
        Some(iter.fold((first, first), |(lo, hi), p| (lo.min(p), hi.max(p))))
    }

    pub fn summary(&self) -> ModelSummary {
        let bounds = self.bounds();
        ModelSummary {
            name: self.name.clone(),
            primitives: self.primitives.len(),
            vertices: self.primitives.iter().map(MeshPrimitive::vertex_count).sum(),
            triangles: self.primitives.iter().map(MeshPrimitive::triangle_count).sum(),
            materials: self.materials.len(),
            images: self.images.len(),
            bounds_min: bounds.map(|(lo, _)| lo.to_array()),
            bounds_max: bounds.map(|(_, hi)| hi.to_array()),
        }
    }
}

fn load_buffers(
    gltf: &gltf::Gltf,
    base: &AssetSource,
    cache: Option<&AssetCache>,
) -> Result<Vec<Vec<u8>>, AssetError> {
    let mut buffers = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            gltf::buffer::Source::Bin => gltf
                .blob
                .clone()
                .ok_or(AssetError::MissingBuffer(buffer.index()))?,
            gltf::buffer::Source::Uri(uri) => load_uri(uri, base, cache)?,
        };
        if data.len() < buffer.length() {
            return Err(AssetError::GltfParse(format!(
                "buffer {} is {} bytes, expected {}",
                buffer.index(),
                data.len(),
                buffer.length()
            )));
        }
        buffers.push(data);
    }
    Ok(buffers)
}

fn load_uri(uri: &str, base: &AssetSource, cache: Option<&AssetCache>) -> Result<Vec<u8>, AssetError> {
    if uri.starts_with("data:") {
        decode_data_uri(uri)
    } else {
        let source = base.join(uri)?;
        tracing::debug!("resolving {uri} as {source}");
        fetch(&source, cache)
    }
}

/// Decode a base64 `data:` URI of any media type.
fn decode_data_uri(uri: &str) -> Result<Vec<u8>, AssetError> {
    let (_, payload) = uri
        .split_once(";base64,")
        .ok_or_else(|| AssetError::UnsupportedUri(truncate(uri)))?;
    Ok(base64::engine::general_purpose::STANDARD.decode(payload)?)
}

fn truncate(uri: &str) -> String {
    uri.chars().take(48).collect()
}

fn load_images(
    gltf: &gltf::Gltf,
    buffers: &[Vec<u8>],
    base: &AssetSource,
    cache: Option<&AssetCache>,
) -> Result<Vec<ImageData>, AssetError> {
    let mut images = Vec::new();
    for image in gltf.images() {
        let encoded = match image.source() {
            gltf::image::Source::View { view, .. } => {
                let buffer = buffers
                    .get(view.buffer().index())
                    .ok_or(AssetError::MissingBuffer(view.buffer().index()))?;
                let start = view.offset();
                let end = start + view.length();
                buffer
                    .get(start..end)
                    .ok_or_else(|| {
                        AssetError::GltfParse(format!("image view {start}..{end} out of range"))
                    })?
                    .to_vec()
            }
            gltf::image::Source::Uri { uri, .. } => load_uri(uri, base, cache)?,
        };
        let decoded = image::load_from_memory(&encoded)
            .map_err(|e| AssetError::Image(e.to_string()))?
            .to_rgba8();
        let (width, height) = decoded.dimensions();
        images.push(ImageData {
            name: image
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("image_{}", image.index())),
            width,
            height,
            rgba: decoded.into_raw(),
        });
    }
    Ok(images)
}

fn import_material(material: gltf::Material<'_>) -> MaterialData {
    let pbr = material.pbr_metallic_roughness();
    let image_of = |info: Option<gltf::texture::Info<'_>>| info.map(|i| i.texture().source().index());
    MaterialData {
        name: material
            .name()
            .map(str::to_string)
            .unwrap_or_else(|| format!("material_{}", material.index().unwrap_or(0))),
        base_color: pbr.base_color_factor(),
        metallic: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        emissive: material.emissive_factor(),
        occlusion_strength: material
            .occlusion_texture()
            .map(|o| o.strength())
            .unwrap_or(1.0),
        alpha_mode: match material.alpha_mode() {
            gltf::material::AlphaMode::Opaque => AlphaMode::Opaque,
            gltf::material::AlphaMode::Mask => AlphaMode::Mask,
            gltf::material::AlphaMode::Blend => AlphaMode::Blend,
        },
        alpha_cutoff: material.alpha_cutoff().unwrap_or(0.5),
        double_sided: material.double_sided(),
        base_color_texture: image_of(pbr.base_color_texture()),
        metallic_roughness_texture: image_of(pbr.metallic_roughness_texture()),
        emissive_texture: image_of(material.emissive_texture()),
        occlusion_texture: material
            .occlusion_texture()
            .map(|o| o.texture().source().index()),
    }
}

fn walk_node(node: &gltf::Node<'_>, parent: Mat4, buffers: &[Vec<u8>], out: &mut Vec<MeshPrimitive>) {
    let world = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        import_mesh(&mesh, world, buffers, out);
    }
    for child in node.children() {
        walk_node(&child, world, buffers, out);
    }
}

fn import_mesh(mesh: &gltf::Mesh<'_>, world: Mat4, buffers: &[Vec<u8>], out: &mut Vec<MeshPrimitive>) {
    let normal_matrix = Mat3::from_mat4(world).inverse().transpose();
    let flips_winding = world.determinant() < 0.0;

    for primitive in mesh.primitives() {
        if primitive.mode() != gltf::mesh::Mode::Triangles {
            tracing::warn!(
                "skipping {:?} primitive in mesh {}",
                primitive.mode(),
                mesh.name().unwrap_or("unnamed")
            );
            continue;
        }

        let reader = primitive.reader(|b| buffers.get(b.index()).map(Vec::as_slice));
        let Some(positions) = reader.read_positions() else {
            tracing::warn!("primitive without positions in mesh {}", mesh.name().unwrap_or("unnamed"));
            continue;
        };
        let positions: Vec<[f32; 3]> = positions
            .map(|p| world.transform_point3(Vec3::from_array(p)).to_array())
            .collect();
        let count = positions.len();

        let mut indices: Vec<u32> = match reader.read_indices() {
            Some(ix) => ix.into_u32().collect(),
            None => (0..count as u32).collect(),
        };
        indices.truncate(indices.len() - indices.len() % 3);
        if flips_winding {
            for tri in indices.chunks_exact_mut(3) {
                tri.swap(1, 2);
            }
        }

        let normals = match reader.read_normals() {
            Some(n) => n
                .map(|n| {
                    (normal_matrix * Vec3::from_array(n))
                        .normalize_or_zero()
                        .to_array()
                })
                .collect(),
            None => compute_normals(&positions, &indices),
        };

        let uvs = match reader.read_tex_coords(0) {
            Some(t) => t.into_f32().collect(),
            None => vec![[0.0, 0.0]; count],
        };

        out.push(MeshPrimitive {
            positions,
            normals,
            uvs,
            indices,
            material: primitive.material().index(),
        });
    }
}

/// Area-weighted vertex normals from triangle faces.
fn compute_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut acc = vec![Vec3::ZERO; positions.len()];
    for tri in indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = Vec3::from_array(positions[a]);
        let pb = Vec3::from_array(positions[b]);
        let pc = Vec3::from_array(positions[c]);
        let face = (pb - pa).cross(pc - pa);
        acc[a] += face;
        acc[b] += face;
        acc[c] += face;
    }
    acc.into_iter()
        .map(|n| n.try_normalize().unwrap_or(Vec3::Y).to_array())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Positions of the triangle (0,0,0) (1,0,0) (0,1,0) as little-endian f32.
    fn triangle_bin() -> Vec<u8> {
        let mut bin = Vec::new();
        for v in [0.0f32, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0] {
            bin.extend_from_slice(&v.to_le_bytes());
        }
        bin
    }

    /// Single-triangle document without normals; `buffer` describes buffer 0.
    fn triangle_doc(node_extra: &str, buffer: serde_json::Value) -> serde_json::Value {
        serde_json::json!({
            "asset": { "version": "2.0" },
            "scene": 0,
            "scenes": [{ "name": "tri_scene", "nodes": [0] }],
            "nodes": [serde_json::from_str::<serde_json::Value>(&format!(
                "{{ \"mesh\": 0 {node_extra} }}"
            )).unwrap()],
            "meshes": [{ "primitives": [{ "attributes": { "POSITION": 0 } }] }],
            "buffers": [buffer],
            "bufferViews": [{ "buffer": 0, "byteOffset": 0, "byteLength": 36 }],
            "accessors": [{
                "bufferView": 0,
                "componentType": 5126,
                "count": 3,
                "type": "VEC3",
                "min": [0.0, 0.0, 0.0],
                "max": [1.0, 1.0, 0.0]
            }]
        })
    }

    /// The triangle with its buffer embedded as a base64 data URI.
    fn triangle_gltf(node_extra: &str) -> Vec<u8> {
        let b64 = base64::engine::general_purpose::STANDARD.encode(triangle_bin());
        let buffer = serde_json::json!({
            "byteLength": 36,
            "uri": format!("data:application/octet-stream;base64,{b64}")
        });
        serde_json::to_vec(&triangle_doc(node_extra, buffer)).unwrap()
    }

    /// The triangle as a binary container with the buffer in the BIN chunk.
    fn triangle_glb() -> Vec<u8> {
        let mut json =
            serde_json::to_vec(&triangle_doc("", serde_json::json!({ "byteLength": 36 }))).unwrap();
        while json.len() % 4 != 0 {
            json.push(b' ');
        }
        let bin = triangle_bin();
        let total = 12 + 8 + json.len() + 8 + bin.len();

        let mut glb = Vec::with_capacity(total);
        glb.extend_from_slice(b"glTF");
        glb.extend_from_slice(&2u32.to_le_bytes());
        glb.extend_from_slice(&(total as u32).to_le_bytes());
        glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"JSON");
        glb.extend_from_slice(&json);
        glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
        glb.extend_from_slice(b"BIN\0");
        glb.extend_from_slice(&bin);
        glb
    }

    fn base() -> AssetSource {
        AssetSource::parse("memory/tri.gltf").unwrap()
    }

    #[test]
    fn import_embedded_triangle() {
        let model = ModelData::import(&triangle_gltf(""), &base(), None).unwrap();
        assert_eq!(model.name, "tri_scene");
        assert_eq!(model.primitives.len(), 1);
        let prim = &model.primitives[0];
        assert_eq!(prim.indices, vec![0, 1, 2]);
        assert_eq!(prim.uvs.len(), 3);
        assert_eq!(prim.material, None);
        for n in &prim.normals {
            assert!(Vec3::from_array(*n).abs_diff_eq(Vec3::Z, 1e-5));
        }
    }

    #[test]
    fn import_binary_container() {
        let model = ModelData::import(&triangle_glb(), &base(), None).unwrap();
        assert_eq!(model.primitives.len(), 1);
        assert_eq!(model.summary().triangles, 1);
        assert_eq!(model.primitives[0].positions[1], [1.0, 0.0, 0.0]);
    }

    #[test]
    fn load_resolves_sibling_buffer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tri data.bin"), triangle_bin()).unwrap();
        let doc = triangle_doc("", serde_json::json!({ "byteLength": 36, "uri": "tri%20data.bin" }));
        let path = dir.path().join("tri.gltf");
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let model = ModelData::load(&AssetSource::Path(path), None).unwrap();
        assert_eq!(model.summary().triangles, 1);
        assert_eq!(model.bounds().unwrap().1, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn node_transform_is_baked() {
        let model =
            ModelData::import(&triangle_gltf(", \"translation\": [0.0, 0.0, 2.0]"), &base(), None)
                .unwrap();
        let (lo, hi) = model.bounds().unwrap();
        assert!((lo.z - 2.0).abs() < 1e-6);
        assert!((hi.z - 2.0).abs() < 1e-6);
    }

    #[test]
    fn mirrored_node_flips_winding() {
        let model =
            ModelData::import(&triangle_gltf(", \"scale\": [-1.0, 1.0, 1.0]"), &base(), None)
                .unwrap();
        let prim = &model.primitives[0];
        assert_eq!(prim.indices, vec![0, 2, 1]);
        // Mirrored triangle with corrected winding still faces +Z.
        assert!(Vec3::from_array(prim.normals[0]).abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn summary_counts() {
        let model = ModelData::import(&triangle_gltf(""), &base(), None).unwrap();
        let s = model.summary();
        assert_eq!(s.vertices, 3);
        assert_eq!(s.triangles, 1);
        assert_eq!(s.bounds_max, Some([1.0, 1.0, 0.0]));
    }

    #[test]
    fn external_buffer_missing_is_io_error() {
        let json = br#"{
            "asset": { "version": "2.0" },
            "buffers": [{ "byteLength": 4, "uri": "nowhere.bin" }]
        }"#;
        let err = ModelData::import(json, &AssetSource::parse("/no/such/dir/m.gltf").unwrap(), None)
            .unwrap_err();
        assert!(matches!(err, AssetError::Io(_)));
    }

    #[test]
    fn model_without_meshes_is_empty() {
        let json = br#"{ "asset": { "version": "2.0" } }"#;
        assert!(matches!(
            ModelData::import(json, &base(), None),
            Err(AssetError::EmptyModel)
        ));
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(matches!(
            ModelData::import(b"{ nope", &base(), None),
            Err(AssetError::GltfParse(_))
        ));
    }

    #[test]
    fn data_uri_requires_base64() {
        assert!(matches!(
            decode_data_uri("data:text/plain,hello"),
            Err(AssetError::UnsupportedUri(_))
        ));
        assert_eq!(decode_data_uri("data:application/octet-stream;base64,AQID").unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn computed_normals_skip_bad_indices() {
        let n = compute_normals(&[[0.0; 3]], &[0, 5, 9]);
        assert_eq!(n, vec![[0.0, 1.0, 0.0]]);
    }
}
