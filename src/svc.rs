//! Signal-driven service lifecycle runner.
//!
//! Standardizes the init / start / wait / stop shape of a long-lived
//! program: implement [Service] and hand it to [run], which blocks until
//! Ctrl-C (SIGINT) and then stops the service.

use tracing::info;

/// Error type carried across service lifecycle calls.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// A program with a standardized lifecycle.
///
/// [Service::start] must be non-blocking: spawn your workers and return.
pub trait Service {
    /// Called once, before the service is started.
    fn init(&mut self) -> Result<(), BoxError>;

    /// Called after [Service::init]. Must return promptly.
    fn start(&mut self) -> Result<(), BoxError>;

    /// Called when the shutdown signal arrives.
    fn stop(&mut self) -> Result<(), BoxError>;
}

/// Run `service` until the process receives Ctrl-C, then stop it.
///
/// The first failing lifecycle call short-circuits and its error is
/// returned; `stop` is not called if `init` or `start` failed.
pub fn run<S: Service>(service: &mut S) -> Result<(), BoxError> {
    let (sender, shutdown) = flume::bounded(1);

    ctrlc::set_handler(move || {
        let _ = sender.try_send(());
    })?;

    run_with_shutdown(service, shutdown)
}

/// [run] with an explicit shutdown trigger instead of the process signal
/// handler. A message on (or disconnection of) `shutdown` stops the service.
pub fn run_with_shutdown<S: Service>(
    service: &mut S,
    shutdown: flume::Receiver<()>,
) -> Result<(), BoxError> {
    service.init()?;
    service.start()?;

    info!("service started, waiting for shutdown signal");
    let _ = shutdown.recv();
    info!("shutdown signal received, stopping service");

    service.stop()
}
