use crate::pose::Pose;
use board_pose_core::CameraModel;
use nalgebra::{Point2, Point3};

/// Project pattern-frame points to distorted pixel coordinates.
///
/// One output per input, same order.
pub fn project_points(points: &[Point3<f64>], pose: &Pose, camera: &CameraModel) -> Vec<Point2<f64>> {
    let r = pose.rotation_matrix();
    points
        .iter()
        .map(|p| camera.project(&Point3::from(r * p.coords + pose.tvec)))
        .collect()
}

/// Integer pixel coordinates for drawing; fractions are truncated toward zero.
pub fn to_pixel_coords(points: &[Point2<f64>]) -> Vec<Point2<i32>> {
    points
        .iter()
        .map(|p| Point2::new(p.x as i32, p.y as i32))
        .collect()
}

/// Root-mean-square pixel distance between projected and observed points.
///
/// `None` unless both slices are non-empty and of equal length.
pub fn reprojection_rmse(
    object: &[Point3<f64>],
    image: &[Point2<f64>],
    pose: &Pose,
    camera: &CameraModel,
) -> Option<f64> {
    if object.is_empty() || object.len() != image.len() {
        return None;
    }
    let sum: f64 = project_points(object, pose, camera)
        .iter()
        .zip(image)
        .map(|(p, q)| (p - q).norm_squared())
        .sum();
    Some((sum / object.len() as f64).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use board_pose_core::{BrownConrady5, CameraIntrinsics};
    use nalgebra::Vector3;

    fn camera() -> CameraModel {
        CameraModel::new(
            CameraIntrinsics::new(600.0, 600.0, 320.0, 240.0),
            BrownConrady5::from_coeffs([0.1, -0.2, 0.001, -0.002, 0.05]).expect("finite"),
        )
    }

    #[test]
    fn empty_in_empty_out() {
        let pose = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        assert!(project_points(&[], &pose, &camera()).is_empty());
        assert!(to_pixel_coords(&[]).is_empty());
    }

    #[test]
    fn pattern_origin_on_optical_axis_hits_principal_point() {
        let pose = Pose::new(Vector3::new(0.2, 0.1, 0.0), Vector3::new(0.0, 0.0, 0.7));
        let px = project_points(&[Point3::origin()], &pose, &camera());
        assert_relative_eq!(px[0], Point2::new(320.0, 240.0), epsilon = 1e-9);
    }

    #[test]
    fn preserves_order_and_count() {
        let pose = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let cam = CameraModel::pinhole(CameraIntrinsics::new(500.0, 500.0, 0.0, 0.0));
        let pts = [
            Point3::new(0.1, 0.0, 0.0),
            Point3::new(0.0, 0.2, 0.0),
            Point3::new(-0.1, 0.0, 1.0),
        ];
        let px = project_points(&pts, &pose, &cam);
        assert_eq!(px.len(), 3);
        assert_relative_eq!(px[0], Point2::new(50.0, 0.0), epsilon = 1e-9);
        assert_relative_eq!(px[1], Point2::new(0.0, 100.0), epsilon = 1e-9);
        assert_relative_eq!(px[2], Point2::new(-25.0, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn rmse_needs_matching_correspondences() {
        let pose = Pose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 1.0));
        let cam = CameraModel::pinhole(CameraIntrinsics::new(500.0, 500.0, 0.0, 0.0));
        let object = [Point3::new(0.1, 0.0, 0.0), Point3::new(0.0, 0.2, 0.0)];
        let exact = project_points(&object, &pose, &cam);

        assert_eq!(reprojection_rmse(&object, &exact, &pose, &cam), Some(0.0));
        let shifted: Vec<Point2<f64>> = exact
            .iter()
            .map(|p| p + nalgebra::Vector2::new(3.0, 4.0))
            .collect();
        assert_relative_eq!(
            reprojection_rmse(&object, &shifted, &pose, &cam).expect("rmse"),
            5.0,
            epsilon = 1e-9
        );

        assert_eq!(reprojection_rmse(&object, &exact[..1], &pose, &cam), None);
        assert_eq!(reprojection_rmse(&[], &[], &pose, &cam), None);
    }

    #[test]
    fn pixel_coords_truncate_toward_zero() {
        let px = to_pixel_coords(&[Point2::new(1.9, -1.9), Point2::new(-0.5, 10.999)]);
        assert_eq!(px, vec![Point2::new(1, -1), Point2::new(0, 10)]);
    }
}
