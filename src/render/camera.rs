use glam::{Vec2, Vec3};

/// Ray in world space with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn at(&self, distance: f32) -> Vec3 {
        self.origin + self.direction * distance
    }
}

/// Perspective viewpoint of the in-memory viewport.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewCamera {
    pub position: Vec3,
    pub yaw: f32,
    pub pitch: f32,
    pub fov_y_deg: f32,
    pub viewport: Vec2,
}

impl ViewCamera {
    pub fn new(position: Vec3, yaw: f32, pitch: f32) -> Self {
        Self {
            position,
            yaw,
            pitch,
            fov_y_deg: 60.0,
            viewport: Vec2::new(1280.0, 720.0),
        }
    }

    pub fn look_at(eye: Vec3, target: Vec3) -> Self {
        let (yaw, pitch) = forward_to_yaw_pitch(target - eye);
        Self::new(eye, yaw, pitch)
    }

    pub fn with_fov(mut self, fov_y_deg: f32) -> Self {
        self.fov_y_deg = fov_y_deg.clamp(1.0, 179.0);
        self
    }

    pub fn with_viewport(mut self, width: f32, height: f32) -> Self {
        self.viewport = Vec2::new(width.max(1.0), height.max(1.0));
        self
    }

    /// Forward, right and up unit vectors.
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        camera_basis(self.yaw, self.pitch)
    }

    /// View direction in world space.
    pub fn direction(&self) -> Vec3 {
        self.basis().0
    }

    pub fn orbit_around(&mut self, pivot: Vec3, yaw_delta: f32, pitch_delta: f32) {
        self.yaw += yaw_delta;
        self.pitch += pitch_delta;
        wrap_angles(&mut self.yaw, &mut self.pitch);

        let distance = self.position.distance(pivot).max(0.05);
        let (dir, _, _) = self.basis();
        self.position = pivot - dir * distance;
    }

    /// Ray through a screen position (top-left origin, pixels).
    pub fn ray(&self, x: f32, y: f32) -> Ray {
        let (forward, right, up) = self.basis();
        let half_height = (self.fov_y_deg.to_radians() * 0.5).tan();
        let aspect = self.viewport.x / self.viewport.y;
        let ndc_x = 2.0 * x / self.viewport.x - 1.0;
        let ndc_y = 1.0 - 2.0 * y / self.viewport.y;
        let direction =
            forward + right * (ndc_x * half_height * aspect) + up * (ndc_y * half_height);
        Ray {
            origin: self.position,
            direction: direction.normalize_or_zero(),
        }
    }

    /// World-space size of one pixel at `distance` from the eye.
    pub fn pixel_size_at(&self, distance: f32) -> f32 {
        2.0 * distance * (self.fov_y_deg.to_radians() * 0.5).tan() / self.viewport.y
    }
}

fn forward_to_yaw_pitch(forward: Vec3) -> (f32, f32) {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO {
        return (0.0, 0.0);
    }
    let yaw = forward.z.atan2(forward.x);
    let pitch = forward.y.clamp(-1.0, 1.0).asin();
    (yaw, pitch)
}

fn camera_basis(yaw: f32, pitch: f32) -> (Vec3, Vec3, Vec3) {
    let cos_pitch = pitch.cos();
    let forward = Vec3::new(yaw.cos() * cos_pitch, pitch.sin(), yaw.sin() * cos_pitch);
    let right = Vec3::new(-yaw.sin(), 0.0, yaw.cos());
    let up = right.cross(forward).normalize_or_zero();
    (forward, right, up)
}

fn wrap_angles(yaw: &mut f32, pitch: &mut f32) {
    const TWO_PI: f32 = std::f32::consts::PI * 2.0;
    if yaw.is_finite() {
        *yaw = (*yaw + std::f32::consts::PI).rem_euclid(TWO_PI) - std::f32::consts::PI;
    }
    if pitch.is_finite() {
        *pitch = (*pitch + std::f32::consts::PI).rem_euclid(TWO_PI) - std::f32::consts::PI;
    }
}
