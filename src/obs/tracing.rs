// self
use crate::{_prelude::*, obs::OpKind};

/// Type alias that resolves to an instrumented future when tracing is enabled.
#[cfg(feature = "tracing")]
pub type InstrumentedOp<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedOp<F> = F;

/// A span builder used by crate operations.
#[derive(Clone, Debug)]
pub struct OpSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl OpSpan {
	/// Creates a new span tagged with the provided operation kind + stage.
	pub fn new(kind: OpKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!("agent_gate.op", op = kind.as_str(), stage);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Enters the span for synchronous sections.
	pub fn entered(self) -> OpSpanGuard {
		#[cfg(feature = "tracing")]
		{
			OpSpanGuard { guard: self.span.entered() }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = self;

			OpSpanGuard {}
		}
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedOp<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// RAII guard returned by [`OpSpan::entered`].
pub struct OpSpanGuard {
	#[cfg(feature = "tracing")]
	#[allow(dead_code)]
	guard: tracing::span::EnteredSpan,
}
impl Debug for OpSpanGuard {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("OpSpanGuard(..)")
	}
}

/// Notes that a job id was defined again before anyone collected it.
pub fn record_job_redefined(job_id: &str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(job_id, "job redefined before collection; last writer wins");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = job_id;
	}
}

/// Notes how many expired jobs an eviction pass removed.
pub fn record_evictions(removed: usize) {
	#[cfg(feature = "tracing")]
	{
		if removed > 0 {
			tracing::debug!(removed, "evicted expired jobs");
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = removed;
	}
}

/// Notes a successful key fetch, flagging rotations by fingerprint.
pub fn record_key_fetched(previous: Option<&str>, current: &str) {
	#[cfg(feature = "tracing")]
	{
		match previous {
			Some(previous) if previous != current =>
				tracing::info!(previous, current, "verification key rotated"),
			Some(_) => tracing::debug!(current, "verification key unchanged"),
			None => tracing::info!(current, "verification key loaded"),
		}
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = (previous, current);
	}
}

/// Notes a rejected bearer token.
pub fn record_rejection(reason: &'static str) {
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(reason, "token rejected");
	}
	#[cfg(not(feature = "tracing"))]
	{
		let _ = reason;
	}
}
