//! Pure calculation functions for derivative dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

/// Scale `source` to fit inside the requested box, preserving aspect ratio.
///
/// Either bound may be omitted; the missing one follows from the aspect ratio.
/// With both bounds the image fits inside the box (the tighter bound wins).
/// Without `upscale`, a result larger than the source leaves the source
/// dimensions untouched.
///
/// # Examples
/// ```
/// # use responsive_image::imaging::scale_dimensions;
/// // 1000x500 into a 480x480 box → 480x240
/// assert_eq!(scale_dimensions((1000, 500), Some(480), Some(480), false), (480, 240));
///
/// // 40x20 into a 480x480 box without upscaling → unchanged
/// assert_eq!(scale_dimensions((40, 20), Some(480), Some(480), false), (40, 20));
/// ```
pub fn scale_dimensions(
    source: (u32, u32),
    width: Option<u32>,
    height: Option<u32>,
    upscale: bool,
) -> (u32, u32) {
    let (src_w, src_h) = source;
    if src_w == 0 || src_h == 0 {
        return source;
    }
    let aspect = src_h as f64 / src_w as f64;

    let (w, h) = match (width, height) {
        (None, None) => return source,
        (Some(w), None) => (w, (w as f64 * aspect).round() as u32),
        (None, Some(h)) => ((h as f64 / aspect).round() as u32, h),
        (Some(w), Some(h)) => {
            if aspect < h as f64 / w as f64 {
                // Wider than the box: width is the binding edge
                (w, (w as f64 * aspect).round() as u32)
            } else {
                ((h as f64 / aspect).round() as u32, h)
            }
        }
    };

    if !upscale && (w > src_w || h > src_h) {
        return source;
    }
    (w.max(1), h.max(1))
}

/// Calculate dimensions needed to fill a target area (resize before crop).
///
/// Returns dimensions that completely cover the target area while maintaining
/// the source aspect ratio. One dimension will match exactly, the other may exceed.
pub fn calculate_fill_dimensions(source: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (tgt_w, tgt_h) = target;

    let src_aspect = src_w as f64 / src_h as f64;
    let tgt_aspect = tgt_w as f64 / tgt_h as f64;

    if src_aspect > tgt_aspect {
        let h = tgt_h;
        let w = (h as f64 * src_aspect).round() as u32;
        (w.max(tgt_w), h)
    } else {
        let w = tgt_w;
        let h = (w as f64 / src_aspect).round() as u32;
        (w, h.max(tgt_h))
    }
}

/// Top-left offset of a centered `target` window inside `filled`.
pub fn center_crop_offset(filled: (u32, u32), target: (u32, u32)) -> (u32, u32) {
    (
        filled.0.saturating_sub(target.0) / 2,
        filled.1.saturating_sub(target.1) / 2,
    )
}
