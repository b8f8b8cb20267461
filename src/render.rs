//! Snapshot Renderer
//!
//! Opens a small three-d window, draws the current frame of the tree as
//! instanced spheres and photo cards, captures the pixels and saves a PNG.

use std::cell::Cell;
use std::path::Path;
use std::rc::Rc;

use three_d::*;
use tracing::{info, warn};

use gesture_tree::blend::{ElementKind, Transform};
use gesture_tree::experience::Experience;

/// Base color of an element kind, warmed toward gold while the message shows
pub fn element_color(kind: ElementKind, message_weight: f32) -> [u8; 3] {
    let base: [f32; 3] = match kind {
        ElementKind::Foliage => [0.13, 0.62, 0.30],
        ElementKind::Spiral => [1.0, 0.84, 0.45],
        ElementKind::Ornament => [0.86, 0.16, 0.20],
        ElementKind::Photo => [0.95, 0.95, 0.95],
        ElementKind::Star => [1.0, 0.85, 0.2],
    };
    let gold = [1.0, 0.78, 0.25];
    let t = match kind {
        ElementKind::Foliage | ElementKind::Spiral => message_weight.clamp(0.0, 1.0),
        _ => 0.0,
    };
    let mut rgb = [0u8; 3];
    for i in 0..3 {
        rgb[i] = ((base[i] * (1.0 - t) + gold[i] * t) * 255.0).round() as u8;
    }
    rgb
}

fn to_vec3(v: glam::Vec3) -> Vec3 {
    vec3(v.x, v.y, v.z)
}

fn to_mat4(t: &Transform, depth_scale: f32) -> Mat4 {
    let q = t.rotation;
    Mat4::from_translation(to_vec3(t.position))
        * Mat4::from(Quat::new(q.w, q.x, q.y, q.z))
        * Mat4::from_nonuniform_scale(t.scale, t.scale, t.scale * depth_scale)
}

fn srgba(rgb: [u8; 3]) -> Srgba {
    Srgba::new(rgb[0], rgb[1], rgb[2], 255)
}

/// Instance data copied out of the experience before the window opens
struct SceneInstances {
    spheres: Vec<(Vec<Mat4>, Srgba)>,
    cards: Vec<Mat4>,
}

fn collect(experience: &Experience) -> SceneInstances {
    let time = experience.snapshot().time;
    let mut spheres = Vec::new();

    for group in experience.groups() {
        let uniforms = group.uniforms(time);
        let color = srgba(element_color(group.kind(), uniforms.message_weight));
        let transforms = (0..group.len()).map(|i| to_mat4(&group.transform(i), 1.0)).collect();
        spheres.push((transforms, color));
    }

    let star = experience.star().transform();
    spheres.push((vec![to_mat4(&star, 1.0)], srgba(element_color(ElementKind::Star, 0.0))));

    let gallery = experience.gallery();
    let cards = gallery
        .photos()
        .iter()
        .chain(gallery.pending())
        .map(|p| to_mat4(&p.transform, 0.05))
        .collect();

    SceneInstances { spheres, cards }
}

/// Render the experience's current frame to a `size`x`size` PNG
pub fn snapshot(experience: &Experience, output: &Path, size: u32) -> anyhow::Result<()> {
    let scene = collect(experience);
    let cam = experience.camera().pose();
    let yaw = experience.scene_yaw();

    let window = Window::new(WindowSettings {
        title: "Gesture Tree - Snapshot".to_string(),
        max_size: Some((size, size)),
        min_size: (size, size),
        ..Default::default()
    })?;

    let context = window.gl();

    let mut camera = Camera::new_perspective(
        Viewport {
            x: 0,
            y: 0,
            width: size,
            height: size,
        },
        to_vec3(cam.position),
        to_vec3(cam.target),
        vec3(0.0, 1.0, 0.0),
        degrees(cam.fov_degrees),
        0.1,
        1000.0,
    );

    let scene_rotation = Mat4::from_angle_y(radians(yaw));
    let mut renderables: Vec<Gm<InstancedMesh, ColorMaterial>> = Vec::new();

    let sphere = CpuMesh::sphere(8);
    for (transforms, color) in &scene.spheres {
        if transforms.is_empty() {
            continue;
        }
        let instances = Instances {
            transformations: transforms.iter().map(|m| scene_rotation * *m).collect(),
            colors: Some(vec![*color; transforms.len()]),
            ..Default::default()
        };
        renderables.push(Gm::new(
            InstancedMesh::new(&context, &instances, &sphere),
            ColorMaterial::default(),
        ));
    }

    if !scene.cards.is_empty() {
        let instances = Instances {
            transformations: scene.cards.iter().map(|m| scene_rotation * *m).collect(),
            colors: Some(vec![srgba(element_color(ElementKind::Photo, 0.0)); scene.cards.len()]),
            ..Default::default()
        };
        renderables.push(Gm::new(
            InstancedMesh::new(&context, &instances, &CpuMesh::cube()),
            ColorMaterial::default(),
        ));
    }

    let saved = Rc::new(Cell::new(false));
    let saved_in_loop = saved.clone();
    let out_path = output.to_path_buf();

    window.render_loop(move |frame_input| {
        camera.set_viewport(frame_input.viewport);

        frame_input
            .screen()
            .clear(ClearState::color_and_depth(0.02, 0.03, 0.08, 1.0, 1.0));

        for obj in &renderables {
            obj.render(&camera, &[]);
        }

        // Capture pixels and save
        let vp = frame_input.viewport;
        let pixels: Vec<[u8; 4]> = frame_input.screen().read_color();
        let flat: Vec<u8> = pixels.iter().flat_map(|p| p.iter().copied()).collect();

        match image::RgbaImage::from_raw(vp.width, vp.height, flat) {
            Some(img) => match img.save(&out_path) {
                Ok(()) => {
                    info!("Saved {}", out_path.display());
                    saved_in_loop.set(true);
                }
                Err(e) => warn!("Failed to save {}: {}", out_path.display(), e),
            },
            None => warn!("Captured buffer does not match {}x{}", vp.width, vp.height),
        }

        FrameOutput { exit: true, ..Default::default() }
    });

    if !saved.get() {
        anyhow::bail!("snapshot was not written to {}", output.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foliage_turns_gold_in_message() {
        let green = element_color(ElementKind::Foliage, 0.0);
        let gold = element_color(ElementKind::Foliage, 1.0);
        assert!(green[1] > green[0]);
        assert_eq!(gold, [255, 199, 64]);
    }

    #[test]
    fn test_ornaments_keep_color() {
        assert_eq!(
            element_color(ElementKind::Ornament, 0.0),
            element_color(ElementKind::Ornament, 1.0)
        );
    }
}
