//! Async Host Loop
//!
//! State setters can be called from any thread, but passes run on the
//! thread that owns the [`Root`]. [`drive`] bridges the two: it installs a
//! waker on the root's scheduler and flushes every time a pass is
//! requested.
//!
//! ```rust,ignore
//! let mut root = Root::new(HostTree::new());
//! root.render(Element::component::<Clock>(()))?;
//! drive(&mut root, |root| root.renderer().markup().contains("12:00")).await?;
//! ```
//!
//! The future borrows the root and is not `Send`; run it on a current
//! thread runtime or a `LocalSet`.

use std::sync::Arc;

use tokio::sync::Notify;
use tracing::trace;

use crate::error::RenderError;
use crate::render::Renderer;
use crate::root::{FlushReport, Root};

/// Flush `root` whenever a pass is requested until `until` returns true.
///
/// `until` is checked after every flush, including the first one. The
/// waker is removed again before returning.
pub async fn drive<R, F>(root: &mut Root<R>, mut until: F) -> Result<FlushReport, RenderError>
where
    R: Renderer,
    F: FnMut(&Root<R>) -> bool,
{
    let notify = Arc::new(Notify::new());
    let waker = Arc::clone(&notify);
    root.set_waker(move || waker.notify_one());

    let mut report = FlushReport::default();
    let outcome = loop {
        match root.flush() {
            Ok(flushed) => report.merge(flushed),
            Err(err) => break Err(err),
        }
        if until(root) {
            break Ok(report);
        }

        trace!("waiting for a pass request");
        notify.notified().await;
    };

    root.clear_waker();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HostTree;
    use crate::tree::host;

    #[tokio::test]
    async fn returns_once_the_condition_holds() {
        let mut root = Root::new(HostTree::new());
        root.render(host("p").child("ready")).unwrap();

        let report = drive(&mut root, |root| root.renderer().markup() == "<p>ready</p>")
            .await
            .unwrap();
        assert!(report.is_idle());
    }
}
