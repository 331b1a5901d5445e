//! Raster helpers

use zkfp_core::constants::image::FILL;

/// Center `src` (`src_w` x `src_h`, 8-bit) inside `dst` (`out_w` x `out_h`)
///
/// Larger sources are cropped evenly on each side, smaller ones are padded
/// with white. Rows missing from a short `src` are left as padding.
pub fn center_crop(src: &[u8], src_w: usize, src_h: usize, dst: &mut [u8], out_w: usize, out_h: usize) {
    let dst = match dst.get_mut(..out_w * out_h) {
        Some(d) => d,
        None => return,
    };
    dst.fill(FILL);
    
    let dy = (src_h as isize - out_h as isize) / 2;
    let dx = (src_w as isize - out_w as isize) / 2;
    
    let x0 = (-dx).max(0) as usize;
    let x1 = (src_w as isize - dx).clamp(0, out_w as isize) as usize;
    if x0 >= x1 {
        return;
    }
    
    for y in 0..out_h {
        let sy = y as isize + dy;
        if sy < 0 || sy >= src_h as isize {
            continue;
        }
        let start = sy as usize * src_w + (x0 as isize + dx) as usize;
        if let Some(row) = src.get(start..start + (x1 - x0)) {
            dst[y * out_w + x0..y * out_w + x1].copy_from_slice(row);
        }
    }
}
