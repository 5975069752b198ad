use deferred_ngin::{
    config::{OutputMode, RendererConfig},
    data_structures::{
        instance::ModelInstance,
        light::{LightBatch, MAX_LIGHTS},
        material::Material,
        scene::{InstanceId, MaterialId, MeshId, Scene},
    },
    pipelines::{
        Command, Geometry, Group, Load, Program, Target, geometry, lighting,
        output::{self, DEBUG_CLEAR, DebugSource, Tile},
        shadow,
        state::{BindingError, BindingState},
    },
    renderer::frame_plan,
};

fn two_material_scene() -> Scene {
    let mut scene = Scene::new();
    let a = scene.add_material(Material::new());
    let b = scene.add_material(Material::new());
    for (mesh, material) in [(0, a), (1, b), (0, a)] {
        scene.add_instance(ModelInstance::new(MeshId(mesh), material));
    }
    scene
}

fn replay(commands: &[Command]) -> BindingState {
    let state = BindingState::replay(commands).expect("plan replays cleanly");
    assert!(state.is_neutral());
    state
}

#[test]
fn geometry_plan_draws_grouped_instances() {
    let plan = geometry::plan(&two_material_scene());
    let state = replay(&plan.commands);
    assert_eq!(state.draws_into(Target::GBuffer), 3);
    assert_eq!(state.clears, vec![Target::GBuffer]);
    assert_eq!(plan.order, vec![InstanceId(0), InstanceId(2), InstanceId(1)]);

    let draws: Vec<Geometry> = plan
        .commands
        .iter()
        .filter_map(|c| match c {
            Command::Draw(g) => Some(*g),
            _ => None,
        })
        .collect();
    assert_eq!(
        draws,
        vec![
            Geometry::Instance { mesh: MeshId(0), slot: 0 },
            Geometry::Instance { mesh: MeshId(0), slot: 1 },
            Geometry::Instance { mesh: MeshId(1), slot: 2 },
        ]
    );
}

#[test]
fn geometry_plan_binds_each_material_once() {
    let plan = geometry::plan(&two_material_scene());
    let binds: Vec<Group> = plan
        .commands
        .iter()
        .filter_map(|c| match c {
            Command::BindGroup { slot: 1, group } => Some(*group),
            _ => None,
        })
        .collect();
    assert_eq!(
        binds,
        vec![Group::Material(MaterialId(0)), Group::Material(MaterialId(1))]
    );
}

#[test]
fn empty_scene_still_clears_the_gbuffer() {
    let plan = geometry::plan(&Scene::new());
    let state = replay(&plan.commands);
    assert_eq!(state.draws_into(Target::GBuffer), 0);
    assert_eq!(state.clears, vec![Target::GBuffer]);
}

#[test]
fn lighting_clears_once_and_draws_per_batch() {
    let state = replay(&lighting::plan(3));
    assert_eq!(state.clears, vec![Target::Lighting]);
    assert_eq!(state.passes, 1);
    assert_eq!(state.draws_into(Target::Lighting), 3);
}

#[test]
fn lighting_without_lights_only_clears() {
    let state = replay(&lighting::plan(0));
    assert_eq!(state.clears, vec![Target::Lighting]);
    assert_eq!(state.draws_into(Target::Lighting), 0);
}

#[test]
fn shadow_plan_is_one_draw() {
    let state = replay(&shadow::plan());
    assert_eq!(state.draws_into(Target::Shadow), 1);
}

#[test]
fn composite_draws_once_to_the_frame() {
    let state = replay(&output::plan(OutputMode::Composite));
    assert_eq!(state.draws_into(Target::Frame), 1);
}

#[test]
fn debug_mosaic_has_eight_tiles_on_indigo() {
    let commands = output::plan(OutputMode::Debug);
    let state = replay(&commands);
    assert_eq!(state.draws_into(Target::Frame), DebugSource::ALL.len());
    assert_eq!(
        commands[0],
        Command::BeginPass {
            target: Target::Frame,
            load: Load::Clear(DEBUG_CLEAR),
        }
    );
    assert!(commands.contains(&Command::SetProgram(Program::Debug)));
}

#[test]
fn tiles_fill_two_rows_of_four() {
    assert_eq!(Tile::at(0).offset, [-1.0, 0.0]);
    assert_eq!(Tile::at(3).offset, [0.5, 0.0]);
    assert_eq!(Tile::at(4).offset, [-1.0, -0.5]);
    assert_eq!(Tile::at(7).offset, [0.5, -0.5]);
    assert!((0..8).all(|i| Tile::at(i).scale == [0.5, 0.5]));
}

#[test]
fn frame_runs_passes_in_order() {
    let plan = frame_plan(&two_material_scene(), 2, &RendererConfig::default());
    let state = replay(&plan.commands);
    assert_eq!(
        state.sequence,
        vec![Target::GBuffer, Target::Lighting, Target::Shadow, Target::Frame]
    );
    assert_eq!(plan.batches, 1);
    assert_eq!(plan.instance_order.len(), 3);
}

#[test]
fn frame_batches_follow_config() {
    let config = RendererConfig::default().with_lights_per_batch(2);
    let plan = frame_plan(&Scene::new(), 5, &config);
    assert_eq!(plan.batches, 3);
    assert_eq!(replay(&plan.commands).draws_into(Target::Lighting), 3);

    let plan = frame_plan(&Scene::new(), MAX_LIGHTS + 1, &RendererConfig::default());
    assert_eq!(plan.batches, 2);
}

#[test]
fn batch_stride_respects_alignment() {
    let size = std::mem::size_of::<LightBatch>() as u64;
    assert_eq!(size, 40992);
    assert_eq!(lighting::batch_stride(256), 41216);
    assert_eq!(lighting::batch_stride(32), size);
    assert_eq!(lighting::batch_stride(0), size);
}

#[test]
fn draw_without_program_is_rejected() {
    let commands = [
        Command::BeginPass {
            target: Target::Shadow,
            load: Load::Keep,
        },
        Command::Draw(Geometry::ScreenQuad),
    ];
    assert_eq!(
        BindingState::replay(&commands),
        Err(BindingError::DrawWithoutProgram)
    );
}

#[test]
fn leaked_binding_is_reported_at_pass_end() {
    let commands = [
        Command::BeginPass {
            target: Target::Lighting,
            load: Load::Keep,
        },
        Command::SetProgram(Program::Lighting),
        Command::BindGroup {
            slot: 1,
            group: Group::GBufferInputs,
        },
        Command::UnsetProgram,
        Command::EndPass,
    ];
    assert_eq!(
        BindingState::replay(&commands),
        Err(BindingError::Leaked {
            target: Target::Lighting,
            program: None,
            groups: vec![(1, Group::GBufferInputs)],
        })
    );
}

#[test]
fn misuse_outside_or_across_passes() {
    assert_eq!(
        BindingState::replay(&[Command::SetProgram(Program::Shadow)]),
        Err(BindingError::OutsidePass(Command::SetProgram(Program::Shadow)))
    );

    let begin = Command::BeginPass {
        target: Target::Frame,
        load: Load::Keep,
    };
    assert_eq!(
        BindingState::replay(&[begin, begin]),
        Err(BindingError::NestedPass(Target::Frame))
    );
    assert_eq!(
        BindingState::replay(&[begin]),
        Err(BindingError::Unterminated(Target::Frame))
    );
    assert_eq!(
        BindingState::replay(&[begin, Command::UnbindGroup { slot: 2 }]),
        Err(BindingError::UnbindEmpty(2))
    );
    assert_eq!(
        BindingState::replay(&[begin, Command::UnsetProgram]),
        Err(BindingError::UnsetEmpty)
    );
}
