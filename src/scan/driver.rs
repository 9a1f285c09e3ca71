//! Scan driver: the only writer of the shared voxel grid.
//!
//! Two paths mutate the grid: the periodic scan loop and ad-hoc calls such as
//! a tap-triggered micro scan or a user reset. Both go through the grid mutex,
//! so updates never interleave. A scan classifies its whole snapshot before
//! taking the lock, then applies the entire batch in one critical section.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::config::ScanConfig;
use super::plane::{apply_plane, PlaneObservation};
use super::source::PointSource;
use crate::core::time::{CycleStats, CycleTimer};
use crate::core::types::{Result, SharedGrid};
use crate::math::Vector3;
use crate::terrain::TerrainAnalyzer;
use crate::voxel::{GridEvent, VoxelGridManager};

/// Buffered grid events per subscriber before the oldest are dropped
pub const EVENT_CHANNEL_CAPACITY: usize = 4096;

/// Summary of one scan
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Points pulled from the source
    pub points: usize,
    /// Points that received a label
    pub labelled_points: usize,
    /// Planes applied
    pub planes: usize,
    /// Grid cells created or replaced
    pub cells_changed: usize,
}

/// Owns classification and serializes every grid mutation
pub struct ScanDriver {
    grid: SharedGrid,
    analyzer: TerrainAnalyzer,
    reference_normal: Vector3,
    interval: Duration,
    events: broadcast::Sender<GridEvent>,
    timer: Mutex<CycleTimer>,
}

impl ScanDriver {
    /// Build a grid and analyzer from a validated config
    pub fn new(config: &ScanConfig) -> Result<Self> {
        config.validate()?;
        let grid = VoxelGridManager::from_config(&config.grid)?;
        let analyzer = TerrainAnalyzer::new(config.analyzer)?;
        Ok(Self::with_grid(
            Arc::new(Mutex::new(grid)),
            analyzer,
            config.reference_normal,
            config.scan_interval(),
        ))
    }

    /// Drive an existing shared grid. Turns on the grid's event log.
    ///
    /// Other clones of `grid` should only read it: their writes are not
    /// published to subscribers until the driver's next mutation.
    pub fn with_grid(
        grid: SharedGrid,
        analyzer: TerrainAnalyzer,
        reference_normal: Vector3,
        interval: Duration,
    ) -> Self {
        lock(&grid).set_event_logging(true);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            grid,
            analyzer,
            reference_normal,
            interval,
            events,
            timer: Mutex::new(CycleTimer::new()),
        }
    }

    pub fn analyzer(&self) -> &TerrainAnalyzer {
        &self.analyzer
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run `f` against the grid under the lock. All reads go through here.
    pub fn read_grid<R>(&self, f: impl FnOnce(&VoxelGridManager) -> R) -> R {
        f(&lock(&self.grid))
    }

    /// Receive every grid change made from now on
    pub fn subscribe(&self) -> broadcast::Receiver<GridEvent> {
        self.events.subscribe()
    }

    /// Timing of periodic/explicit cycles
    pub fn stats(&self) -> CycleStats {
        lock(&self.timer).stats()
    }

    /// One full cycle: snapshot the source, classify, apply labels and planes
    pub fn run_cycle(&self, source: &dyn PointSource) -> ScanReport {
        let started = Instant::now();
        let points = source.points();
        let planes = source.planes();

        let report = self.scan(&points, &planes);

        let elapsed = started.elapsed();
        lock(&self.timer).record(elapsed);
        log::debug!(
            "Scan cycle: {} points, {} labelled, {} planes, {} cells changed in {:.2}ms",
            report.points,
            report.labelled_points,
            report.planes,
            report.cells_changed,
            elapsed.as_secs_f32() * 1000.0
        );
        report
    }

    /// Classify and apply an ad-hoc set of points, e.g. around a tap location
    pub fn micro_scan(&self, points: &[Vector3]) -> ScanReport {
        self.scan(points, &[])
    }

    /// Apply detected planes without a point cloud
    pub fn apply_planes(&self, planes: &[PlaneObservation]) -> usize {
        let mut grid = lock(&self.grid);
        let changed = planes
            .iter()
            .map(|plane| apply_plane(&mut grid, &self.analyzer, plane, self.reference_normal))
            .sum();
        self.publish(&mut grid);
        changed
    }

    /// Clear the grid
    pub fn reset(&self) {
        let mut grid = lock(&self.grid);
        grid.reset();
        self.publish(&mut grid);
    }

    fn scan(&self, points: &[Vector3], planes: &[PlaneObservation]) -> ScanReport {
        // Classification runs outside the lock; only the apply step is serialized.
        let labels = self.analyzer.classify(points, self.reference_normal);

        let mut grid = lock(&self.grid);
        let mut cells_changed = grid.apply_labels(&labels);
        for plane in planes {
            cells_changed += apply_plane(&mut grid, &self.analyzer, plane, self.reference_normal);
        }
        self.publish(&mut grid);

        ScanReport {
            points: points.len(),
            labelled_points: labels.len(),
            planes: planes.len(),
            cells_changed,
        }
    }

    /// Forward pending grid events while still holding the lock, so subscribers
    /// see changes in the order they were made.
    fn publish(&self, grid: &mut VoxelGridManager) {
        for event in grid.drain_events() {
            // No subscribers is fine
            let _ = self.events.send(event);
        }
    }

    /// Start the periodic scan loop on the current tokio runtime.
    ///
    /// Cycles run back to back at `interval`; a slow cycle delays the next tick
    /// instead of bursting. Stopping takes effect between cycles.
    pub fn spawn_periodic(self: &Arc<Self>, source: Arc<dyn PointSource>) -> ScanHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let driver = Arc::clone(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(driver.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            log::info!("Periodic scan started, every {:?}", driver.interval);

            loop {
                tokio::select! {
                    biased;
                    // Fires on stop() or when the handle is dropped
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        if *stop_rx.borrow() {
                            break;
                        }
                        // CPU-bound and may wait on the grid lock, so keep it off the async workers
                        let cycle_driver = Arc::clone(&driver);
                        let cycle_source = Arc::clone(&source);
                        let cycle = tokio::task::spawn_blocking(move || {
                            cycle_driver.run_cycle(cycle_source.as_ref())
                        });
                        if let Err(e) = cycle.await {
                            log::warn!("Scan cycle failed: {}", e);
                        }
                    }
                }
            }

            log::info!("Periodic scan stopped");
        });

        ScanHandle { stop: stop_tx, task }
    }
}

/// Handle to a running periodic scan. Dropping it also stops the loop.
pub struct ScanHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ScanHandle {
    /// Stop the loop and wait for it to exit. No cycle is left half-applied.
    pub async fn stop(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            log::warn!("Periodic scan task ended abnormally: {}", e);
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
///
/// Grid mutations keep the grid consistent at every step, so a poisoned lock
/// still guards valid data.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::source::StaticSource;
    use crate::scan::synthetic::SyntheticTerrain;
    use crate::terrain::TerrainType;
    use crate::voxel::GridConfig;
    use glam::UVec3;

    fn config() -> ScanConfig {
        ScanConfig {
            grid: GridConfig {
                dimensions: [40, 16, 40],
                voxel_size: 0.0625,
            },
            scan_interval_ms: 5,
            ..Default::default()
        }
    }

    fn flat_patch() -> Vec<Vector3> {
        vec![
            Vector3::new(0.01, 0.0, 0.01),
            Vector3::new(0.08, 0.0, 0.01),
            Vector3::new(0.01, 0.0, 0.08),
            Vector3::new(0.08, 0.01, 0.08),
        ]
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut bad = config();
        bad.grid.voxel_size = 0.0;
        assert!(ScanDriver::new(&bad).is_err());
    }

    #[test]
    fn test_run_cycle_applies_labels() {
        let driver = ScanDriver::new(&config()).unwrap();
        let source = StaticSource::new(flat_patch());

        let report = driver.run_cycle(&source);

        assert_eq!(report.points, 4);
        assert_eq!(report.labelled_points, 4);
        // The four points straddle two cells on x and z
        assert_eq!(report.cells_changed, 4);
        driver.read_grid(|grid| {
            assert_eq!(grid.voxel_count(), 4);
            assert_eq!(grid.get_terrain_type(Vector3::new(0.01, 0.0, 0.01)), Some(TerrainType::Traversable));
        });
        assert_eq!(driver.stats().cycle_count, 1);

        // Same snapshot again is idempotent
        assert_eq!(driver.run_cycle(&source).cells_changed, 0);
    }

    #[test]
    fn test_run_cycle_applies_planes() {
        let driver = ScanDriver::new(&config()).unwrap();
        let source = StaticSource::new(Vec::new())
            .with_planes(vec![PlaneObservation::horizontal(Vector3::new(0.0, -0.2, 0.0), 0.25, 0.25)]);

        let report = driver.run_cycle(&source);
        assert_eq!(report.planes, 1);
        assert_eq!(report.cells_changed, 16);
    }

    #[test]
    fn test_read_grid_sees_shared_grid() {
        let grid: SharedGrid = Arc::new(Mutex::new(VoxelGridManager::new(UVec3::splat(8), 0.25).unwrap()));
        let driver = ScanDriver::with_grid(
            Arc::clone(&grid),
            TerrainAnalyzer::default(),
            Vector3::UP,
            Duration::from_millis(5),
        );

        // All four points fall in one 25cm cell
        assert_eq!(driver.micro_scan(&flat_patch()).cells_changed, 1);
        assert_eq!(lock(&grid).voxel_count(), 1);
        assert_eq!(driver.read_grid(|g| g.voxel_count()), 1);
    }

    #[test]
    fn test_micro_scan_and_reset() {
        let driver = ScanDriver::new(&config()).unwrap();
        let report = driver.micro_scan(&flat_patch());
        assert_eq!(report.labelled_points, 4);

        driver.reset();
        driver.read_grid(|grid| assert_eq!(grid.voxel_count(), 0));
        // Micro scans are not timed cycles
        assert_eq!(driver.stats().cycle_count, 0);
    }

    #[test]
    fn test_insufficient_data_changes_nothing() {
        let driver = ScanDriver::new(&config()).unwrap();
        let report = driver.micro_scan(&flat_patch()[..2]);
        assert_eq!(report.labelled_points, 0);
        assert_eq!(report.cells_changed, 0);
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let driver = ScanDriver::new(&config()).unwrap();
        let mut events = driver.subscribe();

        driver.micro_scan(&flat_patch());
        driver.reset();

        let mut created = 0;
        loop {
            match events.recv().await.unwrap() {
                GridEvent::Created { terrain, .. } => {
                    assert_eq!(terrain, TerrainType::Traversable);
                    created += 1;
                }
                GridEvent::Reset => break,
                other => panic!("unexpected event {:?}", other),
            }
        }
        assert_eq!(created, 4);
    }

    #[tokio::test]
    async fn test_periodic_scan_runs_and_stops() {
        let driver = Arc::new(ScanDriver::new(&config()).unwrap());
        let source: Arc<dyn PointSource> = Arc::new(SyntheticTerrain::new(0.5, 0.1, 3).unwrap());

        let handle = driver.spawn_periodic(Arc::clone(&source));
        tokio::time::sleep(Duration::from_millis(60)).await;
        handle.stop().await;

        let cycles = driver.stats().cycle_count;
        assert!(cycles >= 1);
        driver.read_grid(|grid| assert!(grid.voxel_count() > 0));

        // Nothing runs after stop
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(driver.stats().cycle_count, cycles);
    }

    /// Source whose snapshot takes a while, like a sensor read
    struct SlowSource {
        delay: Duration,
        reads: std::sync::atomic::AtomicUsize,
    }

    impl PointSource for SlowSource {
        fn points(&self) -> Vec<Vector3> {
            self.reads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            std::thread::sleep(self.delay);
            flat_patch()
        }
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_periodic_cycle_does_not_block_runtime() {
        let driver = Arc::new(ScanDriver::new(&config()).unwrap());
        let source = Arc::new(SlowSource {
            delay: Duration::from_millis(150),
            reads: Default::default(),
        });

        let handle = driver.spawn_periodic(Arc::clone(&source) as Arc<dyn PointSource>);

        // The first tick fires immediately; other tasks keep running during the cycle
        let started = Instant::now();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(started.elapsed() < Duration::from_millis(120));
        assert_eq!(source.reads.load(std::sync::atomic::Ordering::SeqCst), 1);

        // Stop still waits for the in-flight cycle to finish
        handle.stop().await;
        assert_eq!(driver.stats().cycle_count, 1);
        driver.read_grid(|grid| assert_eq!(grid.voxel_count(), 4));
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_loop() {
        let driver = Arc::new(ScanDriver::new(&config()).unwrap());
        let source: Arc<dyn PointSource> = Arc::new(StaticSource::new(flat_patch()));

        let handle = driver.spawn_periodic(source);
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(handle);
        tokio::time::sleep(Duration::from_millis(20)).await;

        let cycles = driver.stats().cycle_count;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(driver.stats().cycle_count, cycles);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writers_keep_grid_consistent() {
        let driver = Arc::new(ScanDriver::new(&config()).unwrap());
        let source: Arc<dyn PointSource> = Arc::new(SyntheticTerrain::new(0.5, 0.1, 9).unwrap());
        let handle = driver.spawn_periodic(source);

        let tapper = {
            let driver = Arc::clone(&driver);
            tokio::task::spawn_blocking(move || {
                for i in 0..50 {
                    if i % 10 == 0 {
                        driver.reset();
                    } else {
                        driver.micro_scan(&flat_patch());
                    }
                }
            })
        };
        tapper.await.unwrap();
        handle.stop().await;

        driver.read_grid(|grid| {
            assert_eq!(grid.counts_by_type().total(), grid.voxel_count());
            assert!(grid.voxel_count() <= grid.capacity());
        });
    }
}
