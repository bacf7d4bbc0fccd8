//! On-disk trace containers and the gate that decides when to use them.
//!
//! A container is a JSON document with a `header` (geometries) followed
//! by the trace body. Readers that only need geometry stop at the header.

use crate::error::*;
use crate::geometry::*;
use crate::options::Options;
use crate::records::*;
use crate::util::Point;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerHeader<const GRID_DIMENSION: usize> {
    pub source: Option<ShotGeometry<GRID_DIMENSION>>,
    pub receivers: ShotGeometry<GRID_DIMENSION>,
}

impl<const GRID_DIMENSION: usize> ContainerHeader<GRID_DIMENSION> {
    /// Deserialised geometries bypass their constructors.
    fn validate(&self) -> Result<()> {
        if let Some(source) = &self.source {
            source.validate()?;
        }
        self.receivers.validate()
    }
}

/// One shot: geometries, source wavelets and recorded traces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceContainer<const GRID_DIMENSION: usize> {
    pub header: ContainerHeader<GRID_DIMENSION>,
    pub source_data: Option<TraceData>,
    pub traces: TraceData,
}

/// Everything but the header is skipped while parsing.
#[derive(Deserialize)]
struct HeaderOnly<const GRID_DIMENSION: usize> {
    header: ContainerHeader<GRID_DIMENSION>,
}

impl<const GRID_DIMENSION: usize> TraceContainer<GRID_DIMENSION> {
    pub fn new(
        record: &ShotRecord<GRID_DIMENSION>,
        source: Option<&NormalizedStream<GRID_DIMENSION>>,
    ) -> Result<Self> {
        Ok(TraceContainer {
            header: ContainerHeader {
                source: source.map(|s| s.geometry.clone()),
                receivers: record.geometry().clone(),
            },
            source_data: source.and_then(|s| s.data.clone()),
            traces: record.data()?.into_owned(),
        })
    }

    pub fn write<P: AsRef<Path>>(&self, path: &P) -> Result<()> {
        profiling::scope!("persistence::write");
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn read<P: AsRef<Path>>(path: &P) -> Result<Self> {
        profiling::scope!("persistence::read");
        let reader = BufReader::new(std::fs::File::open(path)?);
        let container: Self = serde_json::from_reader(reader)?;
        container.header.validate()?;
        check_trace_shape("container traces", &container.header.receivers, &container.traces)?;
        Ok(container)
    }

    /// Geometry only, the trace body is never materialised.
    pub fn read_header<P: AsRef<Path>>(path: &P) -> Result<ContainerHeader<GRID_DIMENSION>> {
        let reader = BufReader::new(std::fs::File::open(path)?);
        let header: HeaderOnly<GRID_DIMENSION> = serde_json::from_reader(reader)?;
        header.header.validate()?;
        Ok(header.header)
    }
}

/// `{file_path}/{file_name}_{x0}_{y0}.json` from the first source
/// position, or the first receiver when there is no source.
/// `y0` is the crossline coordinate, zero in 2-D. Entries of a tuple
/// result carry their position as an extra `_{i}` suffix.
pub fn container_path<const GRID_DIMENSION: usize>(
    options: &Options,
    source: Option<&ShotGeometry<GRID_DIMENSION>>,
    receivers: &ShotGeometry<GRID_DIMENSION>,
    entry: Option<usize>,
) -> PathBuf {
    let anchor = source
        .unwrap_or(receivers)
        .coordinates()
        .first()
        .copied()
        .unwrap_or_else(Point::<GRID_DIMENSION>::zeros);
    let x0 = anchor[0];
    let y0 = if GRID_DIMENSION == 3 { anchor[1] } else { 0.0 };
    let name = match entry {
        Some(i) => format!("{}_{x0}_{y0}_{i}.json", options.file_name),
        None => format!("{}_{x0}_{y0}.json", options.file_name),
    };
    options.file_path.join(name)
}

/// Persistence gate. Forward shot records are written to a container and
/// replaced by a handle when `save_data_to_disk` is set; tuples are
/// handled element by element and everything else passes through.
pub fn save_to_disk<const GRID_DIMENSION: usize>(
    result: Propagated<GRID_DIMENSION>,
    source: Option<&NormalizedStream<GRID_DIMENSION>>,
    options: &Options,
    forward: bool,
) -> Result<Propagated<GRID_DIMENSION>> {
    save_entry(result, source, options, forward, None)
}

fn save_entry<const GRID_DIMENSION: usize>(
    result: Propagated<GRID_DIMENSION>,
    source: Option<&NormalizedStream<GRID_DIMENSION>>,
    options: &Options,
    forward: bool,
    entry: Option<usize>,
) -> Result<Propagated<GRID_DIMENSION>> {
    match result {
        Propagated::ShotRecord(record)
            if options.save_data_to_disk && forward && !record.is_on_disk() =>
        {
            std::fs::create_dir_all(&options.file_path)?;
            let path = container_path(
                options,
                source.map(|s| &s.geometry),
                record.geometry(),
                entry,
            );
            TraceContainer::new(&record, source)?.write(&path)?;
            info!("shot record saved to {}", path.display());
            Ok(Propagated::ShotRecord(ShotRecord::from_container(
                record.geometry().clone(),
                path,
            )))
        }
        Propagated::Tuple(items) => Ok(Propagated::Tuple(
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| save_entry(item, source, options, forward, Some(i)))
                .collect::<Result<Vec<_>>>()?,
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod unit_tests {
    use super::*;
    use crate::util::*;

    fn record() -> ShotRecord<2> {
        let g = ShotGeometry::new(vec![vector![0.0, 5.0], vector![10.0, 5.0]], 2.0, 4).unwrap();
        let data = TraceData::from_fn(4, 2, |i, j| 0.1 * i as f64 - 1.0 / 3.0 * j as f64);
        ShotRecord::new(g, data).unwrap()
    }

    fn source() -> NormalizedStream<2> {
        let g = ShotGeometry::new(vec![vector![250.5, 10.0]], 2.0, 4).unwrap();
        NormalizedStream::new(g, Some(TraceData::from_element(4, 1, 0.5))).unwrap()
    }

    #[test]
    fn round_trip_test() {
        let dir = tempfile::tempdir().unwrap();
        let options = Options {
            save_data_to_disk: true,
            file_path: dir.path().join("shots"),
            ..Options::default()
        };
        let rec = record();
        let src = source();
        let saved = save_to_disk(Propagated::ShotRecord(rec.clone()), Some(&src), &options, true)
            .unwrap()
            .into_shot_record()
            .unwrap();
        assert!(saved.is_on_disk());
        let path = saved.container_path().unwrap().to_path_buf();
        assert_eq!(path, dir.path().join("shots").join("shot_250.5_0.json"));
        assert_eq!(saved.data().unwrap().into_owned(), rec.data().unwrap().into_owned());

        let header = TraceContainer::<2>::read_header(&path).unwrap();
        assert_eq!(header.source.as_ref(), Some(&src.geometry));
        let reopened = ShotRecord::<2>::open(&path).unwrap();
        assert_eq!(reopened.geometry(), rec.geometry());

        let container = TraceContainer::<2>::read(&path).unwrap();
        assert_eq!(container.source_data, src.data);
    }

    #[test]
    fn gate_passes_through_test() {
        let options = Options::default();
        let r = save_to_disk(Propagated::ShotRecord(record()), None, &options, true).unwrap();
        assert!(!r.as_shot_record().unwrap().is_on_disk());

        let dir = tempfile::tempdir().unwrap();
        let options = Options {
            save_data_to_disk: true,
            file_path: dir.path().to_path_buf(),
            ..Options::default()
        };
        // Backward propagation never persists.
        let r = save_to_disk(Propagated::ShotRecord(record()), None, &options, false).unwrap();
        assert!(!r.as_shot_record().unwrap().is_on_disk());
        // Tuples are handled element-wise.
        let r = save_to_disk(
            Propagated::Tuple(vec![Propagated::ShotRecord(record()), Propagated::Array(TraceData::zeros(1, 1))]),
            None,
            &options,
            true,
        )
        .unwrap();
        let items = r.into_tuple().unwrap();
        assert!(items[0].as_shot_record().unwrap().is_on_disk());
        assert!(matches!(items[1], Propagated::Array(_)));
        assert!(dir.path().join("shot_0_0_0.json").exists());
    }

    #[test]
    fn tuple_records_get_own_containers_test() {
        let dir = tempfile::tempdir().unwrap();
        let options = Options {
            save_data_to_disk: true,
            file_path: dir.path().to_path_buf(),
            ..Options::default()
        };
        let pressure = record();
        let g = ShotGeometry::new(
            vec![vector![0.0, 5.0], vector![10.0, 5.0], vector![20.0, 5.0]],
            2.0,
            4,
        )
        .unwrap();
        let velocity = ShotRecord::new(g, TraceData::from_element(4, 3, 2.0)).unwrap();
        let src = source();
        let items = save_to_disk(
            Propagated::Tuple(vec![
                Propagated::ShotRecord(pressure.clone()),
                Propagated::ShotRecord(velocity.clone()),
            ]),
            Some(&src),
            &options,
            true,
        )
        .unwrap()
        .into_tuple()
        .unwrap();

        let paths: Vec<_> = items
            .iter()
            .map(|item| item.as_shot_record().unwrap().container_path().unwrap().to_path_buf())
            .collect();
        assert_eq!(
            paths,
            vec![
                dir.path().join("shot_250.5_0_0.json"),
                dir.path().join("shot_250.5_0_1.json"),
            ]
        );
        for (item, expected) in items.iter().zip([&pressure, &velocity]) {
            let record = item.as_shot_record().unwrap();
            assert_eq!(record.geometry(), expected.geometry());
            assert_eq!(
                record.data().unwrap().into_owned(),
                expected.data().unwrap().into_owned()
            );
        }
    }
}
