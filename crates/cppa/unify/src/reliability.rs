//! Reliable messaging, error handling, receipts and pulling.

use crate::channel::channel_reference;
use crate::context::UnificationContext;
use crate::error::Result;
use crate::key::{sender_first, Direction, UnificationKey};
use crate::primitives::{merge_attributes, merge_simple_children, MergeRule};
use cppa_document::Element;

const OPTIONAL_BOOLEAN: MergeRule = MergeRule::optional().lenient().boolean();

pub fn as4_reception_awareness<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    ctx.merge_complex_children(key, a, b, out, "DuplicateHandling", direction, duplicate_handling)?;
    retry_handling(a, b, out, direction);
    Ok(())
}

fn duplicate_handling<'p>(
    _ctx: &mut UnificationContext<'p>,
    _key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    merge_simple_children(
        a,
        b,
        out,
        "DuplicateElimination",
        MergeRule::REQUIRED.lenient().boolean(),
    )?;
    persist_duration(a, b, out, direction);
    Ok(())
}

/// Messages are persisted by the receiver, so its `PersistDuration` applies.
pub fn persist_duration(a: &Element, b: &Element, out: &mut Element, direction: Option<Direction>) {
    let (_, receiver) = sender_first(direction, a, b);
    if let Some(duration) = receiver.cppa_child("PersistDuration") {
        out.push(duration.canonicalize());
    }
}

/// Retries are performed by the sender, so its `RetryHandling` applies.
pub fn retry_handling(a: &Element, b: &Element, out: &mut Element, direction: Option<Direction>) {
    let (sender, _) = sender_first(direction, a, b);
    if let Some(retries) = sender.cppa_child("RetryHandling") {
        out.push(retries.canonicalize());
    }
}

pub fn error_handling<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    merge_simple_children(a, b, out, "DeliveryFailuresNotifyProducer", OPTIONAL_BOOLEAN)?;
    merge_simple_children(a, b, out, "ProcessErrorNotifyConsumer", OPTIONAL_BOOLEAN)?;
    merge_simple_children(a, b, out, "ProcessErrorNotifyProducer", OPTIONAL_BOOLEAN)?;
    ctx.merge_complex_children(
        key,
        a,
        b,
        out,
        "ReceiverErrorsReportChannelId",
        direction,
        channel_reference,
    )
}

pub fn receipt_handling<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    merge_simple_children(a, b, out, "ReceiptFormat", MergeRule::optional())?;
    ctx.merge_complex_children(key, a, b, out, "ReceiptChannelId", direction, channel_reference)
}

pub fn pull_handling<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    ctx.merge_complex_children(key, a, b, out, "PullChannelId", direction, channel_reference)
}

/// ebMS2 reliable messaging: attributes must agree exactly.
pub fn ebms2_reliable_messaging<'p>(
    ctx: &mut UnificationContext<'p>,
    key: &UnificationKey,
    a: &'p Element,
    b: &'p Element,
    out: &mut Element,
    direction: Option<Direction>,
) -> Result<()> {
    merge_attributes(a, b, out, true)?;
    ctx.merge_complex_children(key, a, b, out, "DuplicateHandling", direction, duplicate_handling)?;
    persist_duration(a, b, out, direction);
    retry_handling(a, b, out, direction);
    Ok(())
}
