use board_pose_core::{BoardSpec, BrownConrady5, CameraIntrinsics, CameraModel};
use board_pose_pnp::{project_points, solve_pnp, PnpParams, Pose};
use nalgebra::{Point2, Point3, Rotation3, Vector3};

fn reference_camera() -> CameraModel {
    CameraModel::new(
        CameraIntrinsics::new(588.09499804, 593.84617224, 633.1719751, 353.32181687),
        BrownConrady5::from_coeffs([
            0.10588554,
            -0.19755432,
            -0.00568951,
            -0.00416748,
            0.12764793,
        ])
        .expect("finite"),
    )
}

fn rotation_error(a: &Pose, b: &Pose) -> f64 {
    let ra = Rotation3::from_scaled_axis(a.rvec);
    let rb = Rotation3::from_scaled_axis(b.rvec);
    ra.rotation_to(&rb).angle()
}

fn poses() -> Vec<Pose> {
    vec![
        Pose::new(Vector3::zeros(), Vector3::new(-0.11, -0.07, 0.5)),
        Pose::new(Vector3::new(0.35, 0.0, 0.0), Vector3::new(-0.1, -0.05, 0.6)),
        Pose::new(Vector3::new(-0.2, 0.4, 0.1), Vector3::new(0.05, -0.1, 0.8)),
        Pose::new(Vector3::new(0.1, -0.3, 1.4), Vector3::new(0.0, 0.02, 0.45)),
        Pose::new(Vector3::new(2.9, 0.2, 0.0), Vector3::new(0.1, 0.05, 0.7)),
    ]
}

#[test]
fn noise_free_board_poses_are_recovered() {
    let camera = reference_camera();
    let board = BoardSpec::new(10, 7, 0.025);
    let object = board.object_points();
    let scale = 0.025 * 9.0;

    for truth in poses() {
        let image = project_points(&object, &truth, &camera);
        let sol = solve_pnp(&object, &image, &camera, &PnpParams::default()).expect("solved");

        assert!(
            rotation_error(&sol.pose, &truth) < 1e-3,
            "rotation error for {truth:?}"
        );
        assert!(
            (sol.pose.tvec - truth.tvec).norm() < 1e-3 * scale,
            "translation error for {truth:?}"
        );
        assert!(sol.rmse < 1e-4, "rmse {}", sol.rmse);
        assert!(sol.pose.tvec.z > 0.0);
    }
}

#[test]
fn small_pixel_noise_keeps_pose_close() {
    let camera = reference_camera();
    let object = BoardSpec::new(10, 7, 0.025).object_points();
    let truth = Pose::new(Vector3::new(0.2, -0.15, 0.05), Vector3::new(-0.1, -0.06, 0.55));

    let image: Vec<Point2<f64>> = project_points(&object, &truth, &camera)
        .into_iter()
        .enumerate()
        .map(|(k, p)| {
            // deterministic +-0.15px pattern
            let dx = ((k * 37 % 11) as f64 / 10.0 - 0.5) * 0.3;
            let dy = ((k * 53 % 7) as f64 / 6.0 - 0.5) * 0.3;
            Point2::new(p.x + dx, p.y + dy)
        })
        .collect();

    let sol = solve_pnp(&object, &image, &camera, &PnpParams::default()).expect("solved");
    assert!(sol.rmse < 0.2, "rmse {}", sol.rmse);
    assert!(rotation_error(&sol.pose, &truth) < 0.01);
    assert!((sol.pose.tvec - truth.tvec).norm() < 0.005);
}

#[test]
fn linear_initialisation_alone_is_close_for_exact_data() {
    let camera = reference_camera();
    let object = BoardSpec::new(6, 5, 0.04).object_points();
    let truth = Pose::new(Vector3::new(0.1, 0.2, -0.1), Vector3::new(-0.1, -0.08, 0.7));
    let image = project_points(&object, &truth, &camera);

    let params = PnpParams {
        refine: false,
        ..PnpParams::default()
    };
    let sol = solve_pnp(&object, &image, &camera, &params).expect("solved");
    assert_eq!(sol.iterations, 0);
    assert!(rotation_error(&sol.pose, &truth) < 1e-6);
}

#[test]
fn general_point_cloud_uses_dlt() {
    let camera = reference_camera();
    let object: Vec<Point3<f64>> = (0..10)
        .map(|k| {
            let a = k as f64;
            Point3::new(
                0.05 * (a * 1.3).sin(),
                0.05 * (a * 0.7).cos(),
                0.03 * ((a * 2.1).sin() + 1.0),
            )
        })
        .collect();
    let truth = Pose::new(Vector3::new(-0.3, 0.1, 0.2), Vector3::new(0.0, 0.0, 0.4));
    let image = project_points(&object, &truth, &camera);

    let sol = solve_pnp(&object, &image, &camera, &PnpParams::default()).expect("solved");
    assert!(rotation_error(&sol.pose, &truth) < 1e-3);
    assert!((sol.pose.tvec - truth.tvec).norm() < 1e-4);
}
