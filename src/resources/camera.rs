//! Cameras.

use crate::document::CameraSchema;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    Orthographic,
}

/// How the viewport aspect ratio is chosen.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AspectRatio {
    /// Follow the render target.
    Auto,
    Manual(f32),
}

/// Camera attached to a node.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub name: Option<String>,
    pub projection: Projection,
    pub near_clip: f32,
    pub far_clip: Option<f32>,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Half of the orthographic view height.
    pub ortho_height: f32,
    pub aspect_ratio: AspectRatio,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            name: None,
            projection: Projection::Perspective,
            near_clip: 0.1,
            far_clip: None,
            fov: 45.0,
            ortho_height: 10.0,
            aspect_ratio: AspectRatio::Auto,
        }
    }
}

/// Default camera construction.
pub fn create_camera(schema: &CameraSchema) -> Camera {
    let mut camera = Camera { name: schema.name.clone(), ..Default::default() };

    if schema.camera_type == "orthographic" {
        let ortho = schema.orthographic.clone().unwrap_or_default();
        camera.projection = Projection::Orthographic;
        camera.near_clip = ortho.znear;
        camera.far_clip = ortho.zfar.filter(|&z| z > 0.0);
        camera.ortho_height = 0.5 * ortho.ymag;
        if ortho.ymag != 0.0 {
            camera.aspect_ratio = AspectRatio::Manual(ortho.xmag / ortho.ymag);
        }
    } else {
        let persp = schema.perspective.clone().unwrap_or_default();
        camera.near_clip = persp.znear;
        camera.far_clip = persp.zfar.filter(|&z| z > 0.0);
        camera.fov = persp.yfov.to_degrees();
        if let Some(aspect) = persp.aspect_ratio.filter(|&a| a > 0.0) {
            camera.aspect_ratio = AspectRatio::Manual(aspect);
        }
    }
    camera
}
