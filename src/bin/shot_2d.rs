use rand::Rng;
use seisorch::cli::Args;
use seisorch::csv::write_traces_csv;
use seisorch::engine::*;
use seisorch::error::Result;
use seisorch::image::shot_record_image;
use seisorch::model::*;
use seisorch::orchestrator::*;
use seisorch::records::TraceData;
use seisorch::source::*;
use tracing::info;

fn write_outputs(args: &Args, name: &str, data: &TraceData) -> Result<()> {
    if let Some(path) = args.output_path(&format!("{name}.csv")) {
        write_traces_csv(data, args.dt, &path)?;
    }
    if let Some(path) = args.output_path(&format!("{name}.png")) {
        shot_record_image(data, &path)?;
    }
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::cli_setup("shot_2d")?;
    let mut options = args.load_options()?;

    let model = args.model()?;
    options
        .dt_comp
        .get_or_insert(args.dt.min(model.critical_dt()));

    let source = args.source_geometry()?;
    let receivers = args.receiver_geometry()?;
    let wavelet = ricker_wavelet(args.f0, source.dt(), source.nt());
    let wavelet = TraceData::from_column_slice(wavelet.len(), 1, &wavelet);

    let engine = HomogeneousEngine;
    let propagator = Propagator::new(&engine);

    let request = PropagationRequest::new(&model, Operator::Forward, &options)
        .with_source(source.clone())
        .with_source_term(SourceTerm::Traces(wavelet.clone()))
        .with_receivers(receivers.clone());
    let shot = propagator
        .propagate(&request)?
        .into_shot_record()
        .ok_or_else(|| seisorch::error::SeisError::geometry("forward call returned no shot record"))?;
    let data = shot.data()?;
    info!(
        "forward shot: {} traces, {} samples, max amplitude {:.3e}",
        data.ncols(),
        data.nrows(),
        data.amax()
    );
    write_outputs(&args, "forward", &data)?;

    if args.born {
        // A few random point scatterers below the acquisition.
        let grid = *model.grid();
        let mut rng = rand::thread_rng();
        let mut dm = vec![0.0; grid.n_points()];
        let nz = grid.shape()[1] as usize;
        for _ in 0..10 {
            let x = rng.gen_range(0..grid.shape()[0] as usize);
            let z = rng.gen_range(nz / 2..nz);
            dm[x * nz + z] = rng.gen_range(-0.05..0.05);
        }
        let dm = PhysicalParameter::from_vec(grid, dm)?;

        let request = PropagationRequest::new(&model, Operator::Born, &options)
            .with_source(source)
            .with_source_term(SourceTerm::Traces(wavelet))
            .with_receivers(receivers)
            .with_perturbation(&dm);
        let born = propagator
            .propagate(&request)?
            .into_shot_record()
            .ok_or_else(|| seisorch::error::SeisError::geometry("born call returned no shot record"))?;
        let data = born.data()?;
        info!("born shot: max amplitude {:.3e}", data.amax());
        write_outputs(&args, "born", &data)?;
    }
    Ok(())
}
