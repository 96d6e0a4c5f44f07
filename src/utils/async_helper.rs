use std::future::Future;

/// Fire-and-forget spawn for tasks where the caller never looks at the result
///
/// Runs on the ambient Tokio runtime when there is one. Outside of an async
/// context (e.g. a synchronous UI callback) a short-lived thread with its own
/// current_thread runtime is used instead.
pub fn spawn_fire_and_forget<F>(label: &'static str, task: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    match tokio::runtime::Handle::try_current() {
        Ok(handle) => {
            handle.spawn(task);
        }
        Err(_) => {
            std::thread::spawn(move || {
                let rt = match crate::utils::error_handling::create_runtime() {
                    Ok(r) => r,
                    Err(e) => {
                        log::error!("[{}] {}", label, e);
                        return;
                    }
                };
                rt.block_on(task);
            });
        }
    }
}
