//! Foreground-window capture and anchor cropping.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::{ImageFormat, RgbImage};
use parking_lot::Mutex;

use crate::clock::Clock;
use crate::constants::{ANCHOR_EDGE, ANCHOR_HALF_EDGE};
use crate::types::{
    AnchorRecord, CaptureError, CaptureResult, ScreenPoint, ScreenRect, WindowRef,
};

/// Platform boundary for reading the screen.
///
/// Implementations wrap the OS calls; every failure comes back as a
/// [`CaptureError`] rather than a panic.
pub trait ScreenSource: Send + Sync {
    /// The foreground window and its absolute bounds.
    fn foreground_window(&self) -> CaptureResult<(WindowRef, ScreenRect)>;

    /// Absolute cursor position.
    fn cursor_position(&self) -> CaptureResult<ScreenPoint>;

    /// Pixels inside `bounds`, sized `bounds.width x bounds.height`.
    fn grab(&self, bounds: ScreenRect) -> CaptureResult<RgbImage>;
}

/// Everything read from the screen for one capture.
#[derive(Debug, Clone)]
pub struct WindowSnapshot {
    pub window: WindowRef,
    pub bounds: ScreenRect,
    pub cursor: ScreenPoint,
    pub bitmap: RgbImage,
}

/// Turns a screen read into an [`AnchorRecord`] cropped around the cursor.
#[derive(Clone)]
pub struct ScreenCaptureService {
    source: Arc<dyn ScreenSource>,
    clock: Arc<dyn Clock>,
}

impl ScreenCaptureService {
    pub fn new(source: Arc<dyn ScreenSource>, clock: Arc<dyn Clock>) -> Self {
        Self { source, clock }
    }

    /// Read the foreground window without cropping.
    pub fn snapshot(&self) -> CaptureResult<WindowSnapshot> {
        let (window, bounds) = self.source.foreground_window()?;
        let cursor = self.source.cursor_position()?;

        if bounds.is_empty() {
            return Err(CaptureError::EmptyRegion {
                width: bounds.width,
                height: bounds.height,
            });
        }

        let bitmap = self.source.grab(bounds)?;
        if bitmap.width() as i64 != bounds.width as i64
            || bitmap.height() as i64 != bounds.height as i64
        {
            return Err(CaptureError::BitmapMismatch {
                expected_width: bounds.width,
                expected_height: bounds.height,
                actual_width: bitmap.width(),
                actual_height: bitmap.height(),
            });
        }

        Ok(WindowSnapshot {
            window,
            bounds,
            cursor,
            bitmap,
        })
    }

    /// Capture the foreground window and build a fresh anchor record.
    pub fn capture(&self) -> CaptureResult<AnchorRecord> {
        let captured_at = self.clock.now();
        let snapshot = self.snapshot()?;
        let bounds = snapshot.bounds;

        // Widened so a cursor far off screen cannot overflow before the clamp.
        let local_x = (snapshot.cursor.x as i64 - bounds.x as i64)
            .clamp(0, bounds.width as i64 - 1) as i32;
        let local_y = (snapshot.cursor.y as i64 - bounds.y as i64)
            .clamp(0, bounds.height as i64 - 1) as i32;
        let anchor = crop_anchor(&snapshot.bitmap, local_x as u32, local_y as u32);

        tracing::debug!(
            "Captured window {:?} at {:?}, anchor {}x{} around ({local_x}, {local_y})",
            snapshot.window,
            bounds,
            anchor.width(),
            anchor.height()
        );

        Ok(AnchorRecord::new(
            captured_at,
            snapshot.window,
            bounds,
            bounds.origin().offset(local_x, local_y),
            vec![anchor],
        ))
    }
}

/// In-process screen whose foreground window is whatever was last set.
///
/// Used by tests and by drivers that replay recorded screens.
#[derive(Default)]
pub struct ScriptedScreen {
    frame: Mutex<Option<WindowSnapshot>>,
    grabs: AtomicUsize,
}

impl ScriptedScreen {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current foreground window.
    pub fn set_frame(&self, snapshot: WindowSnapshot) {
        *self.frame.lock() = Some(snapshot);
    }

    /// Move the cursor without changing the window.
    pub fn move_cursor(&self, cursor: ScreenPoint) -> bool {
        match self.frame.lock().as_mut() {
            Some(frame) => {
                frame.cursor = cursor;
                true
            }
            None => false,
        }
    }

    /// Forget the current window so captures fail.
    pub fn clear(&self) {
        *self.frame.lock() = None;
    }

    /// Number of bitmap grabs served so far.
    pub fn grab_count(&self) -> usize {
        self.grabs.load(Ordering::SeqCst)
    }
}

impl ScreenSource for ScriptedScreen {
    fn foreground_window(&self) -> CaptureResult<(WindowRef, ScreenRect)> {
        self.frame
            .lock()
            .as_ref()
            .map(|f| (f.window, f.bounds))
            .ok_or_else(|| CaptureError::WindowUnavailable("no foreground window".to_string()))
    }

    fn cursor_position(&self) -> CaptureResult<ScreenPoint> {
        self.frame
            .lock()
            .as_ref()
            .map(|f| f.cursor)
            .ok_or_else(|| CaptureError::WindowUnavailable("no cursor".to_string()))
    }

    fn grab(&self, _bounds: ScreenRect) -> CaptureResult<RgbImage> {
        self.grabs.fetch_add(1, Ordering::SeqCst);
        self.frame
            .lock()
            .as_ref()
            .map(|f| f.bitmap.clone())
            .ok_or_else(|| CaptureError::WindowUnavailable("window closed".to_string()))
    }
}

/// Crop up to 64x64 pixels starting 32 pixels up and left of the cursor,
/// shrinking at the right and bottom edges.
pub fn crop_anchor(bitmap: &RgbImage, cursor_x: u32, cursor_y: u32) -> RgbImage {
    let half = ANCHOR_HALF_EDGE as u32;
    let x = cursor_x.saturating_sub(half);
    let y = cursor_y.saturating_sub(half);
    let w = ANCHOR_EDGE.min(bitmap.width().saturating_sub(x));
    let h = ANCHOR_EDGE.min(bitmap.height().saturating_sub(y));
    image::imageops::crop_imm(bitmap, x, y, w, h).to_image()
}

/// Load an image from a file path.
pub fn capture_from_file(path: &str) -> CaptureResult<RgbImage> {
    Ok(image::open(path)?.to_rgb8())
}

/// Load an image from base64-encoded data.
pub fn capture_from_base64(data: &str, mime: &str) -> CaptureResult<RgbImage> {
    use base64::Engine;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(data)
        .map_err(|e| CaptureError::InvalidInput(format!("Invalid base64: {e}")))?;

    let format = match mime {
        "image/png" => Some(ImageFormat::Png),
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/webp" => Some(ImageFormat::WebP),
        "image/gif" => Some(ImageFormat::Gif),
        _ => None,
    };

    let img = if let Some(fmt) = format {
        image::load_from_memory_with_format(&bytes, fmt)?
    } else {
        image::load_from_memory(&bytes)?
    };
    Ok(img.to_rgb8())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::constants::INITIAL_CONFIDENCE;
    use image::Rgb;

    struct FixedScreen {
        bounds: ScreenRect,
        cursor: ScreenPoint,
    }

    impl ScreenSource for FixedScreen {
        fn foreground_window(&self) -> CaptureResult<(WindowRef, ScreenRect)> {
            Ok((WindowRef(42), self.bounds))
        }

        fn cursor_position(&self) -> CaptureResult<ScreenPoint> {
            Ok(self.cursor)
        }

        fn grab(&self, bounds: ScreenRect) -> CaptureResult<RgbImage> {
            Ok(RgbImage::from_fn(
                bounds.width as u32,
                bounds.height as u32,
                |x, y| Rgb([x as u8, y as u8, 0]),
            ))
        }
    }

    struct BrokenScreen;

    impl ScreenSource for BrokenScreen {
        fn foreground_window(&self) -> CaptureResult<(WindowRef, ScreenRect)> {
            Err(CaptureError::WindowUnavailable("access denied".to_string()))
        }

        fn cursor_position(&self) -> CaptureResult<ScreenPoint> {
            Ok(ScreenPoint::default())
        }

        fn grab(&self, _bounds: ScreenRect) -> CaptureResult<RgbImage> {
            unreachable!("grab must not run without a window")
        }
    }

    fn service(bounds: ScreenRect, cursor: ScreenPoint) -> ScreenCaptureService {
        ScreenCaptureService::new(
            Arc::new(FixedScreen { bounds, cursor }),
            Arc::new(ManualClock::new()),
        )
    }

    #[test]
    fn test_capture_centred_anchor() {
        let svc = service(ScreenRect::new(100, 50, 200, 150), ScreenPoint::new(200, 120));
        let record = svc.capture().unwrap();
        assert_eq!(record.window, WindowRef(42));
        assert_eq!(record.cursor, ScreenPoint::new(200, 120));
        assert_eq!(record.confidence(), INITIAL_CONFIDENCE);
        assert_eq!(record.attempts(), 0);

        let anchor = &record.anchor_images[0];
        assert_eq!(anchor.dimensions(), (64, 64));
        // Local cursor (100, 70) puts the crop origin at (68, 38).
        assert_eq!(anchor.get_pixel(0, 0), &Rgb([68, 38, 0]));
    }

    #[test]
    fn test_capture_near_top_left_edge() {
        let svc = service(ScreenRect::new(0, 0, 200, 150), ScreenPoint::new(10, 5));
        let record = svc.capture().unwrap();
        let anchor = &record.anchor_images[0];
        assert_eq!(anchor.dimensions(), (64, 64));
        assert_eq!(anchor.get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_capture_near_bottom_right_edge_shrinks() {
        let svc = service(ScreenRect::new(0, 0, 80, 50), ScreenPoint::new(79, 49));
        let record = svc.capture().unwrap();
        // Origin (47, 17); crop is min(64, 80-47) x min(64, 50-17).
        assert_eq!(record.anchor_images[0].dimensions(), (33, 33));
    }

    #[test]
    fn test_cursor_outside_window_is_clamped() {
        let svc = service(ScreenRect::new(100, 100, 50, 40), ScreenPoint::new(500, -20));
        let record = svc.capture().unwrap();
        assert_eq!(record.cursor, ScreenPoint::new(149, 100));
    }

    #[test]
    fn test_extreme_cursor_is_clamped() {
        let svc = service(ScreenRect::new(100, 100, 80, 80), ScreenPoint::new(i32::MIN, 0));
        let record = svc.capture().unwrap();
        assert_eq!(record.cursor, ScreenPoint::new(100, 100));
        assert_eq!(record.anchor_images[0].dimensions(), (64, 64));

        let svc = service(
            ScreenRect::new(-50, -50, 80, 80),
            ScreenPoint::new(i32::MAX, i32::MAX),
        );
        let record = svc.capture().unwrap();
        assert_eq!(record.cursor, ScreenPoint::new(29, 29));
    }

    #[test]
    fn test_tiny_window_anchor_is_whole_window() {
        let svc = service(ScreenRect::new(0, 0, 10, 6), ScreenPoint::new(3, 3));
        let record = svc.capture().unwrap();
        assert_eq!(record.anchor_images[0].dimensions(), (10, 6));
    }

    #[test]
    fn test_empty_region_fails() {
        let svc = service(ScreenRect::new(0, 0, 0, 100), ScreenPoint::new(0, 0));
        assert!(matches!(
            svc.capture(),
            Err(CaptureError::EmptyRegion { width: 0, height: 100 })
        ));
        let svc = service(ScreenRect::new(0, 0, 100, -5), ScreenPoint::new(0, 0));
        assert!(matches!(svc.capture(), Err(CaptureError::EmptyRegion { .. })));
    }

    #[test]
    fn test_os_failure_surfaces_as_error() {
        let svc = ScreenCaptureService::new(Arc::new(BrokenScreen), Arc::new(ManualClock::new()));
        assert!(matches!(
            svc.capture(),
            Err(CaptureError::WindowUnavailable(_))
        ));
    }

    #[test]
    fn test_scripted_screen_replays_frame() {
        let screen = Arc::new(ScriptedScreen::new());
        let svc = ScreenCaptureService::new(screen.clone(), Arc::new(ManualClock::new()));
        assert!(svc.capture().is_err());
        assert_eq!(screen.grab_count(), 0);

        screen.set_frame(WindowSnapshot {
            window: WindowRef(3),
            bounds: ScreenRect::new(0, 0, 4, 4),
            cursor: ScreenPoint::new(1, 1),
            bitmap: RgbImage::new(5, 4),
        });
        assert!(matches!(svc.capture(), Err(CaptureError::BitmapMismatch { .. })));
        assert_eq!(screen.grab_count(), 1);

        assert!(screen.move_cursor(ScreenPoint::new(2, 2)));
        screen.clear();
        assert!(!screen.move_cursor(ScreenPoint::new(2, 2)));
    }

    #[test]
    fn test_base64_roundtrip_png() {
        use base64::Engine;
        let img = image::DynamicImage::new_rgb8(3, 2);
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        let data = base64::engine::general_purpose::STANDARD.encode(&buf);
        let loaded = capture_from_base64(&data, "image/png").unwrap();
        assert_eq!(loaded.dimensions(), (3, 2));
    }

    #[test]
    fn test_invalid_base64() {
        assert!(matches!(
            capture_from_base64("!!not base64!!", "image/png"),
            Err(CaptureError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_capture_from_missing_file() {
        assert!(capture_from_file("/nonexistent/screen.png").is_err());
    }
}
