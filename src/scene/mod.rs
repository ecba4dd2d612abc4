//! Scene management
//!
//! Renderable objects live in a `bevy_ecs::World`; the camera and the single
//! point light are plain fields since every demo has exactly one of each.

mod camera;
mod camera_controller;
mod light;
mod transform;

pub use camera::*;
pub use camera_controller::*;
pub use light::*;
pub use transform::*;

use bevy_ecs::prelude::*;

/// Insertion index, used to keep draw order stable
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SpawnOrder(pub usize);

/// The scene containing all renderable content
pub struct Scene {
    world: World,
    pub camera: Camera,
    pub light: PointLight,
    next_order: usize,
}

impl Scene {
    pub fn new(camera: Camera, light: PointLight) -> Self {
        Self {
            world: World::new(),
            camera,
            light,
            next_order: 0,
        }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Spawn a drawable entity
    pub fn spawn_model(&mut self, transform: Transform, renderer: ModelRenderer) -> Entity {
        let order = SpawnOrder(self.next_order);
        self.next_order += 1;
        self.world.spawn((transform, renderer, order)).id()
    }

    /// Spawn a drawable entity that rotates with elapsed time
    pub fn spawn_spinning_model(
        &mut self,
        transform: Transform,
        renderer: ModelRenderer,
        spin: Spin,
    ) -> Entity {
        let entity = self.spawn_model(transform, renderer);
        self.world.entity_mut(entity).insert(spin);
        entity
    }

    /// Set every spinning entity's rotation for the given elapsed time
    pub fn advance(&mut self, elapsed: f32) {
        let mut query = self.world.query::<(&mut Transform, &Spin)>();
        for (mut transform, spin) in query.iter_mut(&mut self.world) {
            transform.rotation = spin.rotation_at(elapsed);
        }
    }

    /// Drawable entities in spawn order
    pub fn draw_list(&mut self) -> Vec<(Transform, ModelRenderer)> {
        let mut query = self
            .world
            .query::<(&Transform, &ModelRenderer, &SpawnOrder)>();
        let mut items: Vec<_> = query
            .iter(&self.world)
            .map(|(transform, renderer, order)| (*order, *transform, *renderer))
            .collect();
        items.sort_by_key(|(order, _, _)| *order);
        items
            .into_iter()
            .map(|(_, transform, renderer)| (transform, renderer))
            .collect()
    }

    /// Change the reflectance model of every drawable
    pub fn set_all_shading(&mut self, shading: crate::shading::ShadingModel) {
        let mut query = self.world.query::<&mut ModelRenderer>();
        for mut renderer in query.iter_mut(&mut self.world) {
            renderer.shading = shading;
        }
    }
}

impl Default for Scene {
    fn default() -> Self {
        Self::new(Camera::default(), PointLight::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shading::ShadingModel;
    use glam::{Quat, Vec3};

    #[test]
    fn draw_list_preserves_spawn_order() {
        let mut scene = Scene::default();
        for (i, shading) in ShadingModel::ALL.iter().enumerate() {
            let transform = Transform::from_position(Vec3::new(i as f32, 0.0, 0.0));
            if i == 1 {
                scene.spawn_model(transform, ModelRenderer::new(0, *shading));
            } else {
                scene.spawn_spinning_model(
                    transform,
                    ModelRenderer::new(0, *shading),
                    Spin::new(Vec3::Y, 1.0),
                );
            }
        }

        let list = scene.draw_list();
        assert_eq!(list.len(), 3);
        for (i, (transform, renderer)) in list.iter().enumerate() {
            assert_eq!(transform.position.x, i as f32);
            assert_eq!(renderer.shading, ShadingModel::ALL[i]);
        }
    }

    #[test]
    fn advance_only_rotates_spinning_entities() {
        let mut scene = Scene::default();
        scene.spawn_model(Transform::new(), ModelRenderer::new(0, ShadingModel::Phong));
        scene.spawn_spinning_model(
            Transform::new(),
            ModelRenderer::new(0, ShadingModel::Toon),
            Spin::new(Vec3::Y, 0.5),
        );

        scene.advance(2.0);
        let list = scene.draw_list();
        assert_eq!(list[0].0.rotation, Quat::IDENTITY);
        assert!((list[1].0.rotation.angle_between(Quat::IDENTITY) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn set_all_shading_switches_every_renderer() {
        let mut scene = Scene::default();
        scene.spawn_model(Transform::new(), ModelRenderer::new(0, ShadingModel::Phong));
        scene.spawn_model(Transform::new(), ModelRenderer::new(1, ShadingModel::Toon));
        scene.set_all_shading(ShadingModel::CookTorrance);
        let list = scene.draw_list();
        assert_eq!(list.len(), 2);
        assert!(list
            .iter()
            .all(|(_, r)| r.shading == ShadingModel::CookTorrance));
    }
}
