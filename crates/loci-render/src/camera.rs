//! Look-at camera producing the particle camera uniforms

use crate::particle_pipeline::CameraUniforms;
use loci_core::Vec3;

/// Perspective camera looking from `position` at `target`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleCamera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Width / height
    pub aspect: f32,
}

impl Default for ParticleCamera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 1.5, 6.0),
            target: Vec3::ZERO,
            up: Vec3::UP,
            fov: 45.0,
            near: 0.1,
            far: 100.0,
            aspect: 1.0,
        }
    }
}

impl ParticleCamera {
    pub fn looking_at(position: Vec3, target: Vec3, aspect: f32) -> Self {
        Self {
            position,
            target,
            aspect,
            ..Self::default()
        }
    }

    fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let f = (self.target - self.position).normalized();
        let s = f.cross(&self.up).normalized();
        let u = s.cross(&f);
        (f, s, u)
    }

    /// View matrix, column-major
    pub fn view_matrix(&self) -> [[f32; 4]; 4] {
        let (f, s, u) = self.basis();
        [
            [s.x, u.x, -f.x, 0.0],
            [s.y, u.y, -f.y, 0.0],
            [s.z, u.z, -f.z, 0.0],
            [
                -s.dot(&self.position),
                -u.dot(&self.position),
                f.dot(&self.position),
                1.0,
            ],
        ]
    }

    /// Right-handed perspective mapping depth to [0, 1]
    pub fn projection_matrix(&self) -> [[f32; 4]; 4] {
        let f = 1.0 / (self.fov.to_radians() / 2.0).tan();
        let range = self.near - self.far;
        [
            [f / self.aspect, 0.0, 0.0, 0.0],
            [0.0, f, 0.0, 0.0],
            [0.0, 0.0, self.far / range, -1.0],
            [0.0, 0.0, self.near * self.far / range, 0.0],
        ]
    }

    pub fn view_projection_matrix(&self) -> [[f32; 4]; 4] {
        mat4_mul(&self.projection_matrix(), &self.view_matrix())
    }

    pub fn uniforms(&self) -> CameraUniforms {
        let (_, s, u) = self.basis();
        CameraUniforms {
            view_proj: self.view_projection_matrix(),
            camera_right: s.to_array(),
            camera_up: u.to_array(),
            ..CameraUniforms::default()
        }
    }
}

fn mat4_mul(a: &[[f32; 4]; 4], b: &[[f32; 4]; 4]) -> [[f32; 4]; 4] {
    let mut result = [[0.0; 4]; 4];
    for (i, col) in result.iter_mut().enumerate() {
        for (j, cell) in col.iter_mut().enumerate() {
            *cell = (0..4).map(|k| a[k][j] * b[i][k]).sum();
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(m: &[[f32; 4]; 4], p: Vec3) -> [f32; 4] {
        let v = [p.x, p.y, p.z, 1.0];
        let mut out = [0.0; 4];
        for (row, o) in out.iter_mut().enumerate() {
            *o = (0..4).map(|col| m[col][row] * v[col]).sum();
        }
        out
    }

    #[test]
    fn target_projects_to_screen_centre() {
        let cam = ParticleCamera::looking_at(Vec3::new(2.0, 3.0, 5.0), Vec3::new(0.0, 1.0, 0.0), 1.5);
        let clip = project(&cam.view_projection_matrix(), cam.target);
        assert!(clip[3] > 0.0);
        assert!((clip[0] / clip[3]).abs() < 1e-5);
        assert!((clip[1] / clip[3]).abs() < 1e-5);
        let depth = clip[2] / clip[3];
        assert!((0.0..=1.0).contains(&depth));
    }

    #[test]
    fn near_and_far_planes_map_to_unit_depth() {
        let cam = ParticleCamera::default();
        let forward = (cam.target - cam.position).normalized();
        let m = cam.view_projection_matrix();
        let near = project(&m, cam.position + forward * cam.near);
        let far = project(&m, cam.position + forward * cam.far);
        assert!((near[2] / near[3]).abs() < 1e-4);
        assert!((far[2] / far[3] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn billboard_axes_are_orthonormal() {
        let u = ParticleCamera::default().uniforms();
        let right = Vec3::from_array(u.camera_right);
        let up = Vec3::from_array(u.camera_up);
        assert!((right.length() - 1.0).abs() < 1e-5);
        assert!((up.length() - 1.0).abs() < 1e-5);
        assert!(right.dot(&up).abs() < 1e-5);
        // camera sits on +z looking toward the origin
        assert!(right.x > 0.99);
        assert!(up.y > 0.9);
    }
}
