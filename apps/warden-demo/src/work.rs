//! Permission checks run away from the thread that logged in.

use std::sync::Arc;
use std::thread;

use anyhow::Context;
use tracing::debug;
use warden_security::{Identity, Permission, resolve_identity};

#[derive(Debug)]
pub struct Report {
    pub worker: String,
    pub principal: Option<String>,
    pub granted: Vec<String>,
    pub denied: Vec<String>,
}

/// Check every permission against the ambient identity of the current thread.
fn check(worker: String, permissions: &[String]) -> anyhow::Result<Report> {
    let identity = resolve_identity()?;
    let (granted, denied): (Vec<String>, Vec<String>) = permissions
        .iter()
        .cloned()
        .partition(|p| identity.is_permitted(&Permission::from(p.as_str())));

    debug!(worker = %worker, authenticated = identity.is_authenticated(), "Checked permissions");
    Ok(Report {
        worker,
        principal: identity.primary_principal().map(|p| p.value().to_owned()),
        granted,
        denied,
    })
}

/// Run one check per OS thread, each wrapped with the caller's identity.
pub fn on_threads(
    identity: &Identity,
    workers: usize,
    permissions: &Arc<[String]>,
) -> anyhow::Result<Vec<Report>> {
    let handles: Vec<_> = (0..workers)
        .map(|n| {
            let permissions = Arc::clone(permissions);
            let work = identity.associate_with(move || check(format!("thread-{n}"), &permissions));
            thread::Builder::new()
                .name(format!("warden-worker-{n}"))
                .spawn(work)
                .context("failed to spawn worker thread")
        })
        .collect::<anyhow::Result<_>>()?;

    handles
        .into_iter()
        .map(|handle| {
            handle
                .join()
                .map_err(|_| anyhow::anyhow!("worker thread panicked"))?
        })
        .collect()
}

/// Run one check per tokio task; the identity follows each task across polls.
pub async fn on_tasks(
    identity: &Identity,
    workers: usize,
    permissions: &Arc<[String]>,
) -> anyhow::Result<Vec<Report>> {
    let handles: Vec<_> = (0..workers)
        .map(|n| {
            let permissions = Arc::clone(permissions);
            tokio::spawn(identity.associate_with_future(async move {
                tokio::task::yield_now().await;
                check(format!("task-{n}"), &permissions)
            }))
        })
        .collect();

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        reports.push(handle.await.context("worker task failed")??);
    }
    Ok(reports)
}
