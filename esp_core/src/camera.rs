//! View and projection built from the MumbleLink camera pose.

use glam::{Mat4, Vec2, Vec3, Vec4};

use esp_link::LinkState;

pub const NEAR_PLANE: f32 = 0.1;
pub const FAR_PLANE: f32 = 30_000.0;
/// Points this far outside the viewport still count as on screen so large
/// boxes do not pop at the edges.
pub const SCREEN_MARGIN: f32 = 50.0;

/// Camera state the overlay needs each frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub forward: Vec3,
    pub avatar_position: Vec3,
    pub fov_radians: f32,
}

impl CameraPose {
    pub fn from_link(link: &LinkState) -> Self {
        Self {
            position: Vec3::from_array(link.camera_position),
            forward: Vec3::from_array(link.camera_front),
            avatar_position: Vec3::from_array(link.avatar_position),
            fov_radians: link.fov,
        }
    }
}

/// Left-handed look-to matrix with world up `(0, 1, 0)`.
fn look_to_lh(eye: Vec3, forward: Vec3) -> Option<Mat4> {
    let z_axis = forward.try_normalize()?;
    let x_axis = Vec3::Y
        .cross(z_axis)
        .try_normalize()
        // Looking straight up or down.
        .or_else(|| Vec3::Z.cross(z_axis).try_normalize())?;
    let y_axis = z_axis.cross(x_axis);
    Some(Mat4::from_cols(
        Vec4::new(x_axis.x, y_axis.x, z_axis.x, 0.0),
        Vec4::new(x_axis.y, y_axis.y, z_axis.y, 0.0),
        Vec4::new(x_axis.z, y_axis.z, z_axis.z, 0.0),
        Vec4::new(-x_axis.dot(eye), -y_axis.dot(eye), -z_axis.dot(eye), 1.0),
    ))
}

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    forward: Vec3,
    avatar_position: Vec3,
    fov_radians: f32,
    view: Mat4,
    projection: Mat4,
    view_projection: Mat4,
    valid: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            avatar_position: Vec3::ZERO,
            fov_radians: esp_link::DEFAULT_FOV_RADIANS,
            view: Mat4::IDENTITY,
            projection: Mat4::IDENTITY,
            view_projection: Mat4::IDENTITY,
            valid: false,
        }
    }
}

impl Camera {
    /// Rebuilds the matrices from `pose`. A degenerate pose or viewport keeps
    /// the previous matrices and returns false.
    pub fn update(&mut self, pose: &CameraPose, screen_width: f32, screen_height: f32) -> bool {
        if !(screen_width > 0.0 && screen_height > 0.0) {
            return false;
        }
        if !pose.position.is_finite() || !pose.fov_radians.is_finite() || pose.fov_radians <= 0.0
        {
            return false;
        }
        let Some(view) = look_to_lh(pose.position, pose.forward) else {
            return false;
        };
        let projection = Mat4::perspective_lh(
            pose.fov_radians,
            screen_width / screen_height,
            NEAR_PLANE,
            FAR_PLANE,
        );

        self.position = pose.position;
        self.forward = pose.forward.normalize();
        self.avatar_position = pose.avatar_position;
        self.fov_radians = pose.fov_radians;
        self.view = view;
        self.projection = projection;
        self.view_projection = projection * view;
        self.valid = true;
        true
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn avatar_position(&self) -> Vec3 {
        self.avatar_position
    }

    pub fn fov_radians(&self) -> f32 {
        self.fov_radians
    }

    pub fn view(&self) -> Mat4 {
        self.view
    }

    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Projects `world` to pixels (Y down), rejecting points behind the
    /// camera or further than `margin` pixels outside the viewport.
    pub fn world_to_screen_with_margin(
        &self,
        world: Vec3,
        screen_width: f32,
        screen_height: f32,
        margin: f32,
    ) -> Option<Vec2> {
        if !self.valid {
            return None;
        }
        let clip = self.view_projection * world.extend(1.0);
        if clip.w <= 0.0 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        if !ndc.x.is_finite() || !ndc.y.is_finite() {
            return None;
        }
        let screen = Vec2::new(
            (ndc.x + 1.0) * 0.5 * screen_width,
            (1.0 - ndc.y) * 0.5 * screen_height,
        );
        let inside = screen.x >= -margin
            && screen.x <= screen_width + margin
            && screen.y >= -margin
            && screen.y <= screen_height + margin;
        inside.then_some(screen)
    }

    pub fn world_to_screen(&self, world: Vec3, screen_width: f32, screen_height: f32) -> Option<Vec2> {
        self.world_to_screen_with_margin(world, screen_width, screen_height, SCREEN_MARGIN)
    }

    /// Inverse of [`Camera::world_to_screen`] for a point at `depth` metres
    /// along the view direction.
    pub fn screen_to_world(
        &self,
        screen: Vec2,
        depth: f32,
        screen_width: f32,
        screen_height: f32,
    ) -> Option<Vec3> {
        if !self.valid || depth <= 0.0 || screen_width <= 0.0 || screen_height <= 0.0 {
            return None;
        }
        let ndc_x = screen.x / screen_width * 2.0 - 1.0;
        let ndc_y = 1.0 - screen.y / screen_height * 2.0;
        // Clip w equals view-space depth for a perspective projection.
        let clip = Vec4::new(ndc_x * depth, ndc_y * depth, 0.0, depth);
        let view_x = clip.x / self.projection.x_axis.x;
        let view_y = clip.y / self.projection.y_axis.y;
        let view_point = Vec4::new(view_x, view_y, depth, 1.0);
        let world = self.view.inverse() * view_point;
        Some(world.truncate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera_at_origin() -> Camera {
        let mut camera = Camera::default();
        let pose = CameraPose {
            position: Vec3::ZERO,
            forward: Vec3::Z,
            avatar_position: Vec3::ZERO,
            fov_radians: 1.0,
        };
        assert!(camera.update(&pose, 1920.0, 1080.0));
        camera
    }

    #[test]
    fn point_ahead_lands_at_screen_center() {
        let camera = camera_at_origin();
        let screen = camera
            .world_to_screen(Vec3::new(0.0, 0.0, 10.0), 1920.0, 1080.0)
            .unwrap();
        assert!((screen - Vec2::new(960.0, 540.0)).length() < 1e-3);
    }

    #[test]
    fn axes_map_right_and_up() {
        let camera = camera_at_origin();
        let right = camera
            .world_to_screen(Vec3::new(1.0, 0.0, 10.0), 1920.0, 1080.0)
            .unwrap();
        let up = camera
            .world_to_screen(Vec3::new(0.0, 1.0, 10.0), 1920.0, 1080.0)
            .unwrap();
        assert!(right.x > 960.0);
        assert!(up.y < 540.0);
    }

    #[test]
    fn behind_camera_is_rejected() {
        let camera = camera_at_origin();
        assert!(
            camera
                .world_to_screen(Vec3::new(0.0, 0.0, -5.0), 1920.0, 1080.0)
                .is_none()
        );
    }

    #[test]
    fn far_off_screen_is_rejected_but_margin_is_tolerated() {
        let camera = camera_at_origin();
        assert!(
            camera
                .world_to_screen(Vec3::new(100.0, 0.0, 10.0), 1920.0, 1080.0)
                .is_none()
        );
        let edge = camera.screen_to_world(Vec2::new(1950.0, 540.0), 10.0, 1920.0, 1080.0);
        let edge = edge.unwrap();
        assert!(camera.world_to_screen(edge, 1920.0, 1080.0).is_some());
        assert!(
            camera
                .world_to_screen_with_margin(edge, 1920.0, 1080.0, 0.0)
                .is_none()
        );
    }

    #[test]
    fn degenerate_pose_keeps_previous_matrices() {
        let mut camera = camera_at_origin();
        let view = camera.view();
        let broken = CameraPose {
            position: Vec3::ZERO,
            forward: Vec3::ZERO,
            avatar_position: Vec3::ZERO,
            fov_radians: 1.0,
        };
        assert!(!camera.update(&broken, 1920.0, 1080.0));
        assert_eq!(camera.view(), view);
        assert!(camera.is_valid());
    }

    #[test]
    fn unset_camera_projects_nothing() {
        let camera = Camera::default();
        assert!(
            camera
                .world_to_screen(Vec3::new(0.0, 0.0, 10.0), 1920.0, 1080.0)
                .is_none()
        );
    }
}
