use crate::gpu::{interleave, sampler_entry, texture_entry, uniform_entry};
use bytemuck::{Pod, Zeroable};
use glint_assets::{AlphaMode, MaterialData, ModelData};
use std::collections::HashMap;
use wgpu::util::DeviceExt;

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialUniforms {
    pub base_color: [f32; 4],
    /// rgb: emissive factor, a: occlusion strength
    pub emissive: [f32; 4],
    /// metallic, roughness, alpha cutoff, alpha mode
    pub params: [f32; 4],
}

impl MaterialUniforms {
    pub fn from_material(m: &MaterialData) -> Self {
        let mode = match m.alpha_mode {
            AlphaMode::Opaque => 0.0,
            AlphaMode::Mask => 1.0,
            AlphaMode::Blend => 2.0,
        };
        Self {
            base_color: m.base_color,
            emissive: [m.emissive[0], m.emissive[1], m.emissive[2], m.occlusion_strength],
            params: [m.metallic, m.roughness, m.alpha_cutoff, mode],
        }
    }
}

struct GpuPrimitive {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    material: usize,
}

struct GpuMaterial {
    bind_group: wgpu::BindGroup,
    blended: bool,
}

/// A model's buffers, textures and material bind groups.
///
/// Materials are uploaded in model order followed by one default material
/// used by primitives that reference none.
pub struct GpuModel {
    primitives: Vec<GpuPrimitive>,
    materials: Vec<GpuMaterial>,
}

impl GpuModel {
    pub fn material_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
        device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("material_bind_group_layout"),
            entries: &[
                uniform_entry(0, wgpu::ShaderStages::FRAGMENT),
                texture_entry(1),
                texture_entry(2),
                texture_entry(3),
                texture_entry(4),
                sampler_entry(5),
            ],
        })
    }

    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        data: &ModelData,
    ) -> Self {
        let _span = tracing::info_span!("upload_model", name = %data.name).entered();
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("material_sampler"),
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::Repeat,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });
        let mut textures = TextureCache::new(device, queue);

        let default_material = MaterialData::default();
        let all_materials: Vec<&MaterialData> = data
            .materials
            .iter()
            .chain(std::iter::once(&default_material))
            .collect();
        let slots: Vec<[usize; 4]> = all_materials
            .iter()
            .map(|m| {
                [
                    textures.slot(device, queue, data, m.base_color_texture, true),
                    textures.slot(device, queue, data, m.metallic_roughness_texture, false),
                    textures.slot(device, queue, data, m.occlusion_texture, false),
                    textures.slot(device, queue, data, m.emissive_texture, true),
                ]
            })
            .collect();

        let materials: Vec<GpuMaterial> = all_materials
            .iter()
            .zip(&slots)
            .map(|(m, slot)| {
                let uniforms = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("material_uniforms"),
                    contents: bytemuck::bytes_of(&MaterialUniforms::from_material(m)),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
                let mut entries = vec![wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.as_entire_binding(),
                }];
                for (binding, &view) in (1..).zip(slot) {
                    entries.push(wgpu::BindGroupEntry {
                        binding,
                        resource: wgpu::BindingResource::TextureView(&textures.views[view]),
                    });
                }
                entries.push(wgpu::BindGroupEntry {
                    binding: 5,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                });
                let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: Some(m.name.as_str()),
                    layout,
                    entries: &entries,
                });
                GpuMaterial {
                    bind_group,
                    blended: m.alpha_mode == AlphaMode::Blend,
                }
            })
            .collect();

        let fallback_material = materials.len() - 1;
        let primitives = data
            .primitives
            .iter()
            .filter(|p| !p.indices.is_empty())
            .map(|p| {
                let vertices = interleave(p);
                GpuPrimitive {
                    vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("model_vertex_buffer"),
                        contents: bytemuck::cast_slice(&vertices),
                        usage: wgpu::BufferUsages::VERTEX,
                    }),
                    index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("model_index_buffer"),
                        contents: bytemuck::cast_slice(&p.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    }),
                    index_count: p.indices.len() as u32,
                    material: p
                        .material
                        .filter(|&m| m < fallback_material)
                        .unwrap_or(fallback_material),
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            "uploaded {} primitives, {} materials, {} textures",
            primitives.len(),
            materials.len(),
            textures.len()
        );
        Self {
            primitives,
            materials,
        }
    }

    /// Record draws for opaque (`blended == false`) or blended primitives.
    /// The caller binds the pipeline and groups 0 and 1.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, blended: bool) {
        for prim in &self.primitives {
            let material = &self.materials[prim.material];
            if material.blended != blended {
                continue;
            }
            pass.set_bind_group(2, &material.bind_group, &[]);
            pass.set_vertex_buffer(0, prim.vertex_buffer.slice(..));
            pass.set_index_buffer(prim.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..prim.index_count, 0, 0..1);
        }
    }

    pub fn has_blended(&self) -> bool {
        self.primitives
            .iter()
            .any(|p| self.materials[p.material].blended)
    }
}

/// One GPU texture per (image, colour space) pair. Slot 0 is plain white,
/// used for every missing texture.
struct TextureCache {
    views: Vec<wgpu::TextureView>,
    lookup: HashMap<(usize, bool), usize>,
}

impl TextureCache {
    fn new(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let white = create_texture(
            device,
            queue,
            "white_texture",
            (1, 1),
            wgpu::TextureFormat::Rgba8Unorm,
            &[255; 4],
        );
        Self {
            views: vec![white],
            lookup: HashMap::new(),
        }
    }

    fn slot(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &ModelData,
        index: Option<usize>,
        srgb: bool,
    ) -> usize {
        let Some(index) = index else {
            return 0;
        };
        if let Some(&slot) = self.lookup.get(&(index, srgb)) {
            return slot;
        }
        let Some(image) = data.images.get(index) else {
            tracing::warn!("material references missing image {index}");
            return 0;
        };
        let format = if srgb {
            wgpu::TextureFormat::Rgba8UnormSrgb
        } else {
            wgpu::TextureFormat::Rgba8Unorm
        };
        let view = create_texture(
            device,
            queue,
            &image.name,
            (image.width, image.height),
            format,
            &image.rgba,
        );
        self.views.push(view);
        let slot = self.views.len() - 1;
        self.lookup.insert((index, srgb), slot);
        slot
    }

    fn len(&self) -> usize {
        self.views.len()
    }
}

/// Full mip chain down to 1x1, level 0 first, concatenated in upload order.
/// Returns the level count and the bytes. Input that is not exactly
/// `width * height * 4` bytes is uploaded as a single level.
fn mip_chain(width: u32, height: u32, rgba: &[u8]) -> (u32, Vec<u8>) {
    let Some(mut level) = image::RgbaImage::from_raw(width, height, rgba.to_vec()) else {
        return (1, rgba.to_vec());
    };
    let mut bytes = rgba.to_vec();
    let mut count = 1;
    while level.width() > 1 || level.height() > 1 {
        let (w, h) = ((level.width() / 2).max(1), (level.height() / 2).max(1));
        level = image::imageops::resize(&level, w, h, image::imageops::FilterType::Triangle);
        bytes.extend_from_slice(level.as_raw());
        count += 1;
    }
    (count, bytes)
}

fn create_texture(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    label: &str,
    (width, height): (u32, u32),
    format: wgpu::TextureFormat,
    rgba: &[u8],
) -> wgpu::TextureView {
    let (mip_level_count, data) = mip_chain(width, height, rgba);
    device
        .create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &data,
        )
        .create_view(&Default::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn material_uniforms_pack_factors() {
        let m = MaterialData {
            base_color: [0.5, 0.25, 1.0, 0.75],
            metallic: 0.2,
            roughness: 0.8,
            emissive: [1.0, 0.5, 0.0],
            occlusion_strength: 0.9,
            alpha_mode: AlphaMode::Mask,
            alpha_cutoff: 0.3,
            ..MaterialData::default()
        };
        let u = MaterialUniforms::from_material(&m);
        assert_eq!(u.base_color, [0.5, 0.25, 1.0, 0.75]);
        assert_eq!(u.emissive, [1.0, 0.5, 0.0, 0.9]);
        assert_eq!(u.params, [0.2, 0.8, 0.3, 1.0]);
    }

    #[test]
    fn mip_chain_halves_to_one_texel() {
        let rgba: Vec<u8> = (0..8 * 2).flat_map(|_| [200, 100, 50, 255]).collect();
        let (count, bytes) = mip_chain(8, 2, &rgba);
        // 8x2, 4x1, 2x1, 1x1
        assert_eq!(count, 4);
        assert_eq!(bytes.len(), (16 + 4 + 2 + 1) * 4);
        assert_eq!(&bytes[bytes.len() - 4..], &[200, 100, 50, 255]);
    }

    #[test]
    fn mip_chain_passes_through_mismatched_data() {
        let (count, bytes) = mip_chain(4, 4, &[255; 4]);
        assert_eq!(count, 1);
        assert_eq!(bytes, vec![255; 4]);
    }

    #[test]
    fn material_uniforms_are_std140_sized() {
        assert_eq!(std::mem::size_of::<MaterialUniforms>() % 16, 0);
        let blend = MaterialUniforms::from_material(&MaterialData {
            alpha_mode: AlphaMode::Blend,
            ..MaterialData::default()
        });
        assert_eq!(blend.params[3], 2.0);
    }
}
