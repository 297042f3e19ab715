use tokio::{
    io::{AsyncRead, AsyncReadExt},
    process::Child,
};
use tracing::warn;

/// Ask the child to stop and schedule a kill without waiting for it to be reaped.
pub fn terminate(child: &mut Child) {
    #[cfg(unix)]
    {
        if let Some(pid) = child.id()
            && let Ok(pid) = libc::pid_t::try_from(pid)
        {
            // SAFETY: plain kill(2) on a pid we spawned and have not reaped yet.
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
    let _ = child.start_kill();
}

/// Read a pipe to the end; read errors are logged and whatever arrived is kept.
pub async fn read_pipe<R>(pipe: Option<R>) -> Vec<u8>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe
        && let Err(e) = pipe.read_to_end(&mut buf).await
    {
        warn!(target: "surge.exec.runner", error = %e, "failed reading command output");
    }
    buf
}

/// Keep only the trailing `limit` bytes.
pub fn keep_tail(mut buf: Vec<u8>, limit: usize) -> Vec<u8> {
    if buf.len() > limit {
        buf.drain(..buf.len() - limit);
    }
    buf
}
