use crate::error::*;
use crate::records::TraceData;
use tracing::info;

fn image_error(e: image::ImageError) -> SeisError {
    SeisError::Io(std::io::Error::other(e))
}

/// Traces as columns, time running down the rows.
/// Amplitudes are scaled symmetrically so zero sits mid-colormap.
pub fn shot_record_image<F: AsRef<std::path::Path>>(data: &TraceData, s: &F) -> Result<()> {
    let (nt, n_traces) = data.shape();
    if nt == 0 || n_traces == 0 {
        return Err(SeisError::dimension("shot record image", "non-empty traces", (nt, n_traces)));
    }
    let scale = data.amax();
    let gradient = colorous::TURBO;
    let mut img = image::RgbImage::new(n_traces as u32, nt as u32);
    for (x, trace) in data.column_iter().enumerate() {
        for (y, v) in trace.iter().enumerate() {
            let r = if scale > 0.0 { 0.5 + 0.5 * v / scale } else { 0.5 };
            let c = gradient.eval_continuous(r.clamp(0.0, 1.0));
            img.put_pixel(x as u32, y as u32, image::Rgb(c.as_array()));
        }
    }
    info!("Writing: {:?}", s.as_ref());
    img.save(s).map_err(image_error)
}
