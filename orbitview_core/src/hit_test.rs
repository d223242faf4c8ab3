//! Pointer-to-body resolution.

use crate::camera::CameraTransform;
use crate::types::{Body, BodyId, Vec2};

/// Maps a pointer position (CSS pixels) back to simulation space using the
/// renderer's transform and returns the first body whose circle contains it.
///
/// Bodies are scanned in snapshot order, so when circles overlap the earlier
/// body wins. `None` means "no selection".
pub fn locate(pointer: Vec2, transform: &CameraTransform, bodies: &[Body]) -> Option<BodyId> {
    let sim = transform.to_sim(pointer);
    bodies.iter().find(|b| b.contains(sim)).map(|b| b.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::{CameraState, Viewport};
    use proptest::prelude::*;
    
    fn transform(scale: f64, ox: f64, oy: f64) -> CameraTransform {
        CameraState {
            scale,
            offset_x: ox,
            offset_y: oy,
            ..Default::default()
        }
        .transform(&Viewport::new(800.0, 600.0, 2.0))
    }
    
    #[test]
    fn test_click_on_projection_selects_body() {
        let bodies = [Body::at_rest(1, Vec2::ZERO, 10.0, "#ffffff")];
        let t = transform(1.0, 0.0, 0.0);
        let screen = t.to_screen(Vec2::ZERO);
        
        assert_eq!(screen, Vec2::new(400.0, 300.0));
        assert_eq!(locate(screen, &t, &bodies), Some(1));
        assert_eq!(locate(Vec2::new(screen.x + 1000.0, screen.y), &t, &bodies), None);
    }
    
    #[test]
    fn test_radius_scales_with_zoom() {
        let bodies = [Body::at_rest(4, Vec2::new(50.0, 50.0), 10.0, "#ffffff")];
        let t = transform(3.0, -50.0, -50.0);
        
        // 10 sim units = 30 px at 3x zoom
        assert_eq!(locate(Vec2::new(429.0, 300.0), &t, &bodies), Some(4));
        assert_eq!(locate(Vec2::new(431.0, 300.0), &t, &bodies), None);
    }
    
    #[test]
    fn test_first_body_wins_on_overlap() {
        let bodies = [
            Body::at_rest(9, Vec2::ZERO, 20.0, "#ffffff"),
            Body::at_rest(3, Vec2::new(5.0, 0.0), 20.0, "#ffffff"),
        ];
        let t = transform(1.0, 0.0, 0.0);
        assert_eq!(locate(t.to_screen(Vec2::new(4.0, 0.0)), &t, &bodies), Some(9));
    }
    
    #[test]
    fn test_empty_snapshot_selects_nothing() {
        let t = transform(1.0, 0.0, 0.0);
        assert_eq!(locate(Vec2::new(400.0, 300.0), &t, &[]), None);
    }
    
    proptest! {
        #[test]
        fn prop_locate_inverts_renderer_transform(
            x in -5.0e3..5.0e3f64,
            y in -5.0e3..5.0e3f64,
            r in 0.5..50.0f64,
            scale in 0.1..3.0f64,
            ox in -5.0e3..5.0e3f64,
            oy in -5.0e3..5.0e3f64,
        ) {
            let bodies = [Body::at_rest(11, Vec2::new(x, y), r, "#ffffff")];
            let t = transform(scale, ox, oy);
            let screen = t.to_screen(bodies[0].position);
            let back = t.to_sim(screen);
            
            prop_assert!((back.x - x).abs() < 1e-6);
            prop_assert!((back.y - y).abs() < 1e-6);
            prop_assert_eq!(locate(screen, &t, &bodies), Some(11));
        }
    }
}
