use crossbeam::channel::{self, Receiver, Sender};
use glam::Vec3;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crate::assets::save_mesh;
use crate::mesh::{TriangleMesh, generate_grid};

pub enum MeshCommand {
    Generate {
        resolution_x: u32,
        resolution_z: u32,
        size: Vec3,
    },
    Export {
        path: PathBuf,
        mesh: TriangleMesh,
    },
    Stop,
}

pub enum MeshResult {
    Grid { mesh: TriangleMesh, elapsed_ms: f32 },
    Exported { path: String },
    Error(String),
}

/// Grid generation and OBJ export run off the render thread; results come
/// back over a channel and the GPU upload happens when they are received.
pub struct MeshEngine {
    tx_cmd: Sender<MeshCommand>,
    rx_result: Receiver<MeshResult>,
    last_error: Arc<Mutex<Option<String>>>,
    thread_handle: Option<JoinHandle<()>>,
}

impl MeshEngine {
    pub fn new() -> Self {
        let (tx_cmd, rx_cmd) = channel::unbounded::<MeshCommand>();
        let (tx_result, rx_result) = channel::bounded::<MeshResult>(2);
        let last_error = Arc::new(Mutex::new(None));
        let last_error_clone = Arc::clone(&last_error);

        let thread_handle = thread::spawn(move || {
            mesh_thread(rx_cmd, tx_result, last_error_clone);
        });

        Self {
            tx_cmd,
            rx_result,
            last_error,
            thread_handle: Some(thread_handle),
        }
    }

    pub fn generate(&self, resolution_x: u32, resolution_z: u32, size: Vec3) {
        let _ = self.tx_cmd.send(MeshCommand::Generate {
            resolution_x,
            resolution_z,
            size,
        });
    }

    pub fn export(&self, path: PathBuf, mesh: TriangleMesh) {
        let _ = self.tx_cmd.send(MeshCommand::Export { path, mesh });
    }

    pub fn try_recv_result(&self) -> Option<MeshResult> {
        self.rx_result.try_recv().ok()
    }

    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    pub fn stop(&self) {
        let _ = self.tx_cmd.send(MeshCommand::Stop);
    }
}

impl Drop for MeshEngine {
    fn drop(&mut self) {
        let _ = self.tx_cmd.send(MeshCommand::Stop);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

fn mesh_thread(
    rx_cmd: Receiver<MeshCommand>,
    tx_result: Sender<MeshResult>,
    last_error: Arc<Mutex<Option<String>>>,
) {
    loop {
        let cmd = match rx_cmd.recv() {
            Ok(c) => c,
            Err(_) => return,
        };

        match cmd {
            MeshCommand::Generate {
                resolution_x,
                resolution_z,
                size,
            } => {
                *last_error.lock() = None;

                let start = Instant::now();
                let mesh = generate_grid(resolution_x, resolution_z, size);
                let elapsed_ms = start.elapsed().as_secs_f32() * 1000.0;

                let _ = tx_result.send(MeshResult::Grid { mesh, elapsed_ms });
            }
            MeshCommand::Export { path, mesh } => {
                *last_error.lock() = None;

                match save_mesh(&path, &mesh) {
                    Ok(()) => {
                        let _ = tx_result.send(MeshResult::Exported {
                            path: path.display().to_string(),
                        });
                    }
                    Err(e) => {
                        *last_error.lock() = Some(e.clone());
                        let _ = tx_result.send(MeshResult::Error(e));
                    }
                }
            }
            MeshCommand::Stop => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn worker_generates_and_delivers() {
        let engine = MeshEngine::new();
        engine.generate(400, 100, Vec3::new(1.0, 0.05, 0.5));

        let mut received = None;
        for _ in 0..500 {
            if let Some(r) = engine.try_recv_result() {
                received = Some(r);
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        match received {
            Some(MeshResult::Grid { mesh, elapsed_ms }) => {
                assert_eq!(mesh.vertex_count(), 40_000);
                assert_eq!(mesh.index_count(), 237_006);
                assert!(elapsed_ms >= 0.0);
            }
            _ => panic!("no grid result from worker"),
        }
        assert!(engine.last_error().is_none());
    }
}
