//! Snapshot sinks.
//!
//! The engine hands every sink the static metadata once and then one snapshot
//! per resolved step (plus the initial state at t = 0). Sinks are append-only;
//! any failure is fatal to the run.

use crate::config::SimConfig;
use crate::core::Particle;
use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Fractional digits for particle state lines.
pub const STATE_DECIMALS: usize = 6;

/// Run-level constants, written once.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticMetadata {
    pub num_particles: usize,
    pub aperture: f64,
    pub radius: f64,
    pub mass: f64,
    pub speed: f64,
    pub steps: u64,
}

impl StaticMetadata {
    pub fn from_config(config: &SimConfig) -> Self {
        Self {
            num_particles: config.num_particles,
            aperture: config.aperture,
            radius: config.radius,
            mass: config.mass,
            speed: config.speed,
            steps: config.steps,
        }
    }

    /// Line-delimited record: N, L, r, m, v, T.
    pub fn to_lines(&self) -> String {
        format!(
            "{}\n{}\n{}\n{}\n{}\n{}\n",
            self.num_particles, self.aperture, self.radius, self.mass, self.speed, self.steps
        )
    }
}

/// State of the system after a step.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    /// Simulated time.
    pub time: f64,
    /// Ids of disks that struck a wall or corner in the step that produced this snapshot.
    pub boundary_hits: &'a [u32],
    pub particles: &'a [Particle],
}

/// Receiver of simulation output.
pub trait SnapshotSink {
    fn write_static(&mut self, meta: &StaticMetadata) -> Result<()>;
    fn write_snapshot(&mut self, snapshot: &Snapshot<'_>) -> Result<()>;
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Writes `static.txt` and `dynamic.txt` into a simulation directory.
#[derive(Debug)]
pub struct FileSink {
    dir: PathBuf,
    dynamic: BufWriter<File>,
}

impl FileSink {
    pub const STATIC_FILE: &'static str = "static.txt";
    pub const DYNAMIC_FILE: &'static str = "dynamic.txt";

    /// Create the directory (and parents) and open `dynamic.txt` for writing.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| sink_err(&dir, e))?;
        let path = dir.join(Self::DYNAMIC_FILE);
        let file = File::create(&path).map_err(|e| sink_err(&path, e))?;
        Ok(Self {
            dir,
            dynamic: BufWriter::new(file),
        })
    }

    /// Output directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn dynamic_path(&self) -> PathBuf {
        self.dir.join(Self::DYNAMIC_FILE)
    }
}

impl SnapshotSink for FileSink {
    fn write_static(&mut self, meta: &StaticMetadata) -> Result<()> {
        let path = self.dir.join(Self::STATIC_FILE);
        fs::write(&path, meta.to_lines()).map_err(|e| sink_err(&path, e))
    }

    fn write_snapshot(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
        write_frame(&mut self.dynamic, snapshot).map_err(|e| sink_err(&self.dynamic_path(), e))
    }

    fn flush(&mut self) -> Result<()> {
        self.dynamic
            .flush()
            .map_err(|e| sink_err(&self.dynamic_path(), e))
    }
}

/// Write one frame: a header with the time and the boundary-hit ids, then `x y vx vy` per disk.
pub fn write_frame<W: Write>(w: &mut W, snapshot: &Snapshot<'_>) -> std::io::Result<()> {
    write!(w, "{}", snapshot.time)?;
    for id in snapshot.boundary_hits {
        write!(w, " {id}")?;
    }
    writeln!(w)?;
    for p in snapshot.particles {
        writeln!(
            w,
            "{:.prec$} {:.prec$} {:.prec$} {:.prec$}",
            p.r[0],
            p.r[1],
            p.v[0],
            p.v[1],
            prec = STATE_DECIMALS
        )?;
    }
    Ok(())
}

fn sink_err(path: &Path, e: std::io::Error) -> Error {
    Error::Sink(format!("{}: {e}", path.display()))
}

/// An owned copy of one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub time: f64,
    pub boundary_hits: Vec<u32>,
    /// (x, y, vx, vy) per disk.
    pub states: Vec<[f64; 4]>,
}

/// Keeps everything in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub metadata: Option<StaticMetadata>,
    pub frames: Vec<Frame>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotSink for MemorySink {
    fn write_static(&mut self, meta: &StaticMetadata) -> Result<()> {
        self.metadata = Some(meta.clone());
        Ok(())
    }

    fn write_snapshot(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
        self.frames.push(Frame {
            time: snapshot.time,
            boundary_hits: snapshot.boundary_hits.to_vec(),
            states: snapshot
                .particles
                .iter()
                .map(|p| [p.r[0], p.r[1], p.v[0], p.v[1]])
                .collect(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn static_lines_in_order() {
        let meta = StaticMetadata {
            num_particles: 50,
            aperture: 0.03,
            radius: 0.0015,
            mass: 1.0,
            speed: 0.01,
            steps: 5000,
        };
        assert_eq!(meta.to_lines(), "50\n0.03\n0.0015\n1\n0.01\n5000\n");
    }

    #[test]
    fn frame_format() -> Result<()> {
        let ps = vec![Particle::new(1, [0.02, 0.045], [0.01, -0.005], 0.0015, 1.0)?];
        let mut buf = Vec::new();
        write_frame(
            &mut buf,
            &Snapshot {
                time: 1.5,
                boundary_hits: &[1],
                particles: &ps,
            },
        )?;
        let text = String::from_utf8(buf).map_err(|e| Error::Sink(e.to_string()))?;
        assert_eq!(text, "1.5 1\n0.020000 0.045000 0.010000 -0.005000\n");
        Ok(())
    }

    #[test]
    fn memory_sink_copies_state() -> Result<()> {
        let ps = vec![Particle::new(1, [0.02, 0.045], [0.01, 0.0], 0.0015, 1.0)?];
        let mut sink = MemorySink::new();
        sink.write_snapshot(&Snapshot {
            time: 0.0,
            boundary_hits: &[],
            particles: &ps,
        })?;
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0].states[0], [0.02, 0.045, 0.01, 0.0]);
        Ok(())
    }
}
