use nalgebra::{Matrix4, Orthographic3};

/// Pixel space for text: origin in the bottom left corner, y up, one unit per pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenProjection {
    pub width: u32,
    pub height: u32,
}

impl ScreenProjection {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn matrix(&self) -> Matrix4<f32> {
        Orthographic3::new(
            0.0,
            self.width.max(1) as f32,
            0.0,
            self.height.max(1) as f32,
            -1.0,
            1.0,
        )
        .into_inner()
    }

    /// Column major, ready for a uniform buffer.
    pub fn to_cols_array(&self) -> [[f32; 4]; 4] {
        self.matrix().into()
    }
}
