use deferred_ngin::{
    cgmath::{Deg, InnerSpace, Quaternion, Rotation3, Vector3},
    context::Context,
    data_structures::{
        instance::ModelInstance,
        light::Light,
        material::Material,
        model::Mesh,
        scene::InstanceId,
        shapes,
        texture::Texture,
    },
    flow::{FrameTick, SceneFlow, World, run},
};

const GRID: i32 = 5;
const SPACING: f32 = 2.5;
const ORBIT_RADIUS: f32 = 6.0;

/// A grid of spinning cubes over a floor, lit by an ambient term, a sun,
/// a spot light and a ring of orbiting coloured point lights.
#[derive(Default)]
struct LitCubes {
    cubes: Vec<InstanceId>,
    /// Index of the first orbiting light in the scene's light list.
    first_orbiter: usize,
    elapsed: f32,
}

impl SceneFlow for LitCubes {
    fn on_init(&mut self, ctx: &Context, world: &mut World) -> anyhow::Result<()> {
        let policy = world.config.tangent_policy;
        let (vertices, triangles) = shapes::cube();
        let cube = world
            .assets
            .add_mesh(Mesh::new(&ctx.device, "cube", &vertices, &triangles, policy)?);
        let (vertices, triangles) = shapes::quad();
        let quad = world
            .assets
            .add_mesh(Mesh::new(&ctx.device, "floor", &vertices, &triangles, policy)?);

        let checker = world.assets.add_texture(checker_texture(ctx)?);
        let materials = [
            Material::new().with_albedo_color([0.9, 0.2, 0.2, 1.0]),
            Material::new()
                .with_albedo(checker)
                .with_specular_color([0.6, 0.6, 0.6, 1.0]),
            Material::new()
                .with_albedo_color([0.2, 0.4, 0.9, 1.0])
                .with_emissive_color([0.0, 0.05, 0.2, 0.3]),
        ]
        .map(|m| world.scene.add_material(m));
        let floor = world
            .scene
            .add_material(Material::new().with_albedo_color([0.5, 0.5, 0.5, 1.0]));

        for x in -GRID / 2..=GRID / 2 {
            for z in -GRID / 2..=GRID / 2 {
                let material = materials[(x + z).rem_euclid(3) as usize];
                let instance = ModelInstance::new(cube, material)
                    .with_position(Vector3::new(x as f32 * SPACING, 0.5, z as f32 * SPACING));
                self.cubes.push(world.scene.add_instance(instance));
            }
        }
        world.scene.add_instance(
            ModelInstance::new(quad, floor)
                .with_rotation(Quaternion::from_angle_x(Deg(-90.0)))
                .with_scale(Vector3::new(30.0, 30.0, 1.0)),
        );

        world.scene.add_light(Light::ambient([1.0; 3], 0.08));
        world.scene.add_light(Light::directional(
            [1.0, 0.95, 0.8],
            0.4,
            Vector3::new(-0.3, -1.0, -0.5),
        ));
        world.scene.add_light(Light::spot(
            [1.0; 3],
            1.5,
            Vector3::new(0.0, 8.0, 0.0),
            Vector3::new(0.0, -1.0, 0.0),
            Deg(15.0),
            Deg(25.0),
        ));
        self.first_orbiter = world.scene.lights().len();
        let colors = [[1.0, 0.3, 0.3], [0.3, 1.0, 0.3], [0.3, 0.3, 1.0], [1.0, 1.0, 0.3]];
        for color in colors {
            world
                .scene
                .add_light(Light::point(color, 2.0, Vector3::new(0.0, 1.5, 0.0)));
        }

        world.camera.position = (0.0, 6.0, 14.0).into();
        world.camera.pitch = Deg(-20.0);
        log::info!(
            "lit-cubes: {} instances, {} lights",
            world.scene.instances().len(),
            world.scene.lights().len()
        );
        Ok(())
    }

    fn on_update(&mut self, _ctx: &Context, world: &mut World, tick: &FrameTick<'_>) {
        let dt = tick.dt.as_secs_f32();
        self.elapsed += dt;

        for (i, id) in self.cubes.iter().enumerate() {
            if let Some(instance) = world.scene.instance_mut(*id) {
                let axis = Vector3::new(1.0, i as f32 * 0.3 + 1.0, 0.5).normalize();
                let spin = Quaternion::from_axis_angle(axis, Deg(45.0 * dt));
                instance.set_rotation(spin * instance.rotation());
            }
        }

        let lights = &mut world.scene.lights_mut()[self.first_orbiter..];
        let count = lights.len() as f32;
        for (i, light) in lights.iter_mut().enumerate() {
            if let Light::Point { position, .. } = light {
                let angle = self.elapsed * 0.6 + i as f32 / count * std::f32::consts::TAU;
                *position = Vector3::new(
                    angle.cos() * ORBIT_RADIUS,
                    1.5,
                    angle.sin() * ORBIT_RADIUS,
                );
            }
        }
    }
}

fn checker_texture(ctx: &Context) -> anyhow::Result<Texture> {
    const SIZE: u32 = 8;
    let pixels: Vec<u8> = (0..SIZE * SIZE)
        .flat_map(|i| {
            let (x, y) = (i % SIZE, i / SIZE);
            if (x + y) % 2 == 0 {
                [240, 240, 240, 255]
            } else {
                [40, 40, 40, 255]
            }
        })
        .collect();
    Ok(Texture::from_pixels(
        &ctx.device,
        &ctx.queue,
        SIZE,
        SIZE,
        &pixels,
        "checker",
    )?)
}

fn main() -> anyhow::Result<()> {
    run(LitCubes::default())
}
