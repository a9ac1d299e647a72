use glam::DVec2;
use merge_env::parameters::ScenarioParameters;
use merge_env::scenario::population::{
    draw_spawns, VehicleClass, HIGHWAY_SPAWN_POINTS, RAMP_SPAWN_POINTS,
};
use merge_env::scenario::road_builder::{MERGE_LANE, RAMP_Y};
use merge_env::scenario::{MergeEnv, TERMINAL_X};
use merge_env::units::Speed;
use merge_env::vehicle::{MetaAction, VehicleKind, VehicleState};
use rand::SeedableRng;
use rand_xorshift::XorShiftRng;
use serde_json::json;

fn get_env() -> MergeEnv {
    MergeEnv::new(ScenarioParameters::default()).unwrap()
}

fn move_primary(env: &mut MergeEnv, position: DVec2, speed: f64) {
    let id = env.controlled_vehicles()[0];
    env.road_mut()
        .unwrap()
        .set_vehicle_state(
            id,
            VehicleState {
                position,
                heading: 0.0,
                speed: Speed(speed),
            },
        )
        .unwrap();
}

#[test]
fn seeded_reset_test() {
    let mut env = get_env();
    let (first, _) = env.reset(Some(2024)).unwrap();
    let (second, _) = env.reset(Some(2024)).unwrap();
    assert_eq!(first, second);
    let mut other_env = get_env();
    let (third, _) = other_env.reset(Some(2024)).unwrap();
    assert_eq!(first, third);
    // Same seed, same trajectory.
    for _ in 0..3 {
        let a = env.step(MetaAction::Faster).unwrap();
        let b = other_env.step(MetaAction::Faster).unwrap();
        assert_eq!(a.observation, b.observation);
        assert_eq!(a.reward, b.reward);
        assert_eq!(a.info, b.info);
    }
}

#[test]
fn population_layout_test() {
    let mut env = get_env();
    env.configure(&json!({"controlled_vehicles": 3, "other_vehicles": 6}))
        .unwrap();
    env.reset(Some(11)).unwrap();
    let road = env.road().unwrap();
    assert_eq!(road.vehicles().len(), 9);
    assert_eq!(env.controlled_vehicles().len(), 3);
    for vehicle in road.vehicles() {
        if env.controlled_vehicles().contains(&vehicle.id()) {
            assert!(matches!(vehicle.kind(), VehicleKind::Agent(_)));
            assert!((vehicle.position().y - RAMP_Y).abs() < 1e-9);
        } else {
            assert!(matches!(vehicle.kind(), VehicleKind::Autonomous(_)));
            assert!(vehicle.position().y.abs() < 1e-9);
        }
        assert!((25.0..27.0).contains(&vehicle.speed().0));
    }
}

#[test]
fn spawn_points_unique_test() {
    for seed in 0..50 {
        let mut rng = XorShiftRng::seed_from_u64(seed);
        let spawns = draw_spawns(&mut rng, 6, 6).unwrap();
        let mut ramp: Vec<f64> = spawns
            .iter()
            .filter(|s| s.class == VehicleClass::Agent)
            .map(|s| s.offset)
            .collect();
        let mut highway: Vec<f64> = spawns
            .iter()
            .filter(|s| s.class == VehicleClass::Autonomous)
            .map(|s| s.offset)
            .collect();
        ramp.sort_by(f64::total_cmp);
        highway.sort_by(f64::total_cmp);
        // All the spawn points are used exactly once.
        assert_eq!(ramp, RAMP_SPAWN_POINTS.to_vec());
        assert_eq!(highway, HIGHWAY_SPAWN_POINTS.to_vec());
    }
}

#[test]
fn oversubscription_test() {
    let mut env = get_env();
    env.configure(&json!({"controlled_vehicles": 7})).unwrap();
    assert!(env.reset(Some(0)).is_err());
    assert!(env.step(MetaAction::Idle).is_err());
    let mut env = get_env();
    env.configure(&json!({"other_vehicles": 7})).unwrap();
    assert!(env.reset(Some(0)).is_err());
    let mut env = get_env();
    env.configure(&json!({"controlled_vehicles": 6, "other_vehicles": 6}))
        .unwrap();
    assert!(env.reset(Some(0)).is_ok());
}

#[test]
fn configure_test() {
    let mut env = get_env();
    assert!(env.configure(&json!({"not_an_option": true})).is_err());
    assert!(env.configure(&json!({"policy_frequency": 0})).is_err());
    assert!(env.configure(&json!({"controlled_vehicles": 0})).is_err());
    assert_eq!(env.parameters(), &ScenarioParameters::default());
    env.configure(&json!({"policy_frequency": 5})).unwrap();
    assert_eq!(env.parameters().frames_per_step(), 3);
}

#[test]
fn configure_between_steps_test() {
    let mut env = get_env();
    env.reset(Some(3)).unwrap();
    let before = env.reward(None).unwrap();
    let terms = env.rewards(None).unwrap();
    env.configure(&json!({"high_speed_reward": 5.0, "other_vehicles": 2}))
        .unwrap();
    // The weights apply immediately, the vehicle count at the next reset.
    let after = env.reward(None).unwrap();
    assert_ne!(before, after);
    assert_eq!(after, terms.reward(&env.parameters().reward_weights()));
    assert_eq!(env.road().unwrap().vehicles().len(), 6);
    env.reset(Some(3)).unwrap();
    assert_eq!(env.road().unwrap().vehicles().len(), 3);
}

#[test]
fn invalid_action_code_test() {
    assert!(MetaAction::try_from(5_i64).is_err());
    assert_eq!(MetaAction::try_from(1_i64).unwrap(), MetaAction::Idle);
}

#[test]
fn termination_boundary_test() {
    let mut env = get_env();
    env.reset(Some(5)).unwrap();
    assert!(!env.is_terminated().unwrap());
    move_primary(&mut env, DVec2::new(TERMINAL_X, 4.0), 25.0);
    assert!(!env.is_terminated().unwrap());
    move_primary(&mut env, DVec2::new(TERMINAL_X + 0.01, 4.0), 25.0);
    assert!(env.is_terminated().unwrap());
}

#[test]
fn crash_terminates_test() {
    let mut env = get_env();
    env.reset(Some(1)).unwrap();
    for _ in 0..2 {
        let result = env.step(MetaAction::Idle).unwrap();
        assert!(!result.terminated);
        assert!(!result.info.crashed);
    }
    let id = env.controlled_vehicles()[0];
    env.road_mut()
        .unwrap()
        .vehicle_mut(id)
        .unwrap()
        .set_crashed(true);
    let result = env.step(MetaAction::Idle).unwrap();
    assert!(result.terminated);
    assert!(!result.truncated);
    assert!(result.info.crashed);
    let rewards = result.info.rewards.unwrap();
    assert_eq!(rewards.collision, 1.0);
    assert!(result.reward < 0.5);
}

#[test]
fn slow_merge_penalty_test() {
    let mut env = get_env();
    env.reset(Some(9)).unwrap();
    let primary = env.vehicle().unwrap();
    assert_eq!(primary.target_speed(), Speed(25.0));
    let weight = env.parameters().merging_speed_reward;
    let mut previous = f64::INFINITY;
    for speed in [24.0, 23.0, 22.0, 21.0, 20.0] {
        move_primary(&mut env, DVec2::new(260.0, 8.0), speed);
        assert_eq!(env.vehicle().unwrap().lane_index(), MERGE_LANE);
        let rewards = env.rewards(Some(MetaAction::Idle)).unwrap();
        assert_eq!(rewards.lane_change, 0.0);
        let contribution = weight * rewards.merging_speed;
        assert!(contribution < 0.0);
        assert!(contribution <= previous);
        previous = contribution;
    }
}

#[test]
fn stepped_slow_merge_penalty_test() {
    let mut env = get_env();
    env.configure(&json!({"target_speeds": [10.0, 15.0, 20.0]}))
        .unwrap();
    env.reset(Some(9)).unwrap();
    move_primary(&mut env, DVec2::new(232.0, 8.0), 2.0);
    let weight = env.parameters().merging_speed_reward;
    let actions = [
        MetaAction::Slower,
        MetaAction::Idle,
        MetaAction::Faster,
        MetaAction::Idle,
        MetaAction::Idle,
    ];
    let mut contributions: Vec<f64> = Vec::new();
    let mut deficits: Vec<f64> = Vec::new();
    for action in actions {
        let result = env.step(action).unwrap();
        let vehicle = env.vehicle().unwrap();
        assert_eq!(vehicle.lane_index(), MERGE_LANE);
        assert!(!result.info.crashed);
        assert!(vehicle.speed() < vehicle.target_speed());
        let rewards = result.info.rewards.unwrap();
        assert_eq!(rewards.lane_change, 0.0);
        let contribution = weight * rewards.merging_speed;
        assert!(contribution < 0.0);
        let deficit = (vehicle.target_speed() - vehicle.speed()).0 / vehicle.target_speed().0;
        if let (Some(&last_deficit), Some(&last_contribution)) =
            (deficits.last(), contributions.last())
        {
            if deficit > last_deficit {
                assert!(contribution <= last_contribution);
            }
        }
        contributions.push(contribution);
        deficits.push(deficit);
    }
    // Raising the target speed widens the deficit.
    assert!(deficits[2] > deficits[1]);
    assert!(contributions[2] < contributions[1]);
}

#[test]
fn target_speed_schedule_test() {
    let mut env = get_env();
    env.configure(&json!({"target_speeds": []})).unwrap();
    env.reset(Some(0)).unwrap();
    assert!(env.rewards(None).is_err());
    assert!(env.step(MetaAction::Idle).is_err());

    let mut env = get_env();
    env.configure(&json!({"target_speeds": [25.0]})).unwrap();
    env.reset(Some(0)).unwrap();
    assert!(env.reward(None).is_err());

    let mut env = get_env();
    env.reset(Some(0)).unwrap();
    let result = env.step(MetaAction::Faster).unwrap();
    assert_eq!(result.info.rewards.unwrap().high_speed, 1.0);
    let result = env.step(MetaAction::Slower).unwrap();
    assert_eq!(result.info.rewards.unwrap().high_speed, 0.5);
}

#[test]
fn lane_change_penalty_test() {
    let mut env = get_env();
    env.reset(Some(4)).unwrap();
    let result = env.step(MetaAction::LaneLeft).unwrap();
    assert_eq!(result.info.rewards.unwrap().lane_change, 1.0);
    assert_eq!(result.info.action, Some(MetaAction::LaneLeft));
}

#[test]
fn autonomous_vehicles_avoid_forbidden_lanes_test() {
    let mut env = get_env();
    env.reset(Some(21)).unwrap();
    for _ in 0..10 {
        let result = env.step(MetaAction::Idle).unwrap();
        let road = env.road().unwrap();
        for vehicle in road.vehicles().iter().filter(|v| !v.is_agent()) {
            let target = road.network().get_lane(vehicle.target_lane_index()).unwrap();
            assert!(
                !target.is_forbidden(),
                "Vehicle {} targets {}",
                vehicle.id(),
                vehicle.target_lane_index()
            );
        }
        if result.terminated {
            break;
        }
    }
}

#[test]
fn trajectories_test() {
    let mut env = get_env();
    env.configure(&json!({"show_trajectories": true})).unwrap();
    env.reset(Some(0)).unwrap();
    env.step(MetaAction::Idle).unwrap();
    assert_eq!(env.vehicle().unwrap().history().unwrap().len(), 15);
    env.step(MetaAction::Idle).unwrap();
    env.step(MetaAction::Idle).unwrap();
    assert_eq!(env.vehicle().unwrap().history().unwrap().len(), 30);

    let mut env = get_env();
    env.reset(Some(0)).unwrap();
    env.step(MetaAction::Idle).unwrap();
    assert!(env.vehicle().unwrap().history().is_none());
}

#[test]
fn step_info_serialization_test() {
    let mut env = get_env();
    env.reset(Some(0)).unwrap();
    let result = env.step(MetaAction::Idle).unwrap();
    let info = serde_json::to_value(&result.info).unwrap();
    assert_eq!(info["action"], json!(1));
    assert!(info["rewards"]["merging_speed"].is_number());
    assert!(info["speed"].is_number());
}
