use uuid::Uuid;

use super::{load_json, scan_json, stage_json};
use crate::errors::{LotteryError, LotteryResult};
use crate::storage::{KvRead, StoreTransaction};
use crate::ticket::{Ticket, TicketDraw};

fn ticket_key(id: Uuid) -> String {
    format!("ticket:{}", id)
}

fn participation_key(ticket_id: Uuid, draw_id: Uuid) -> String {
    format!("ticketdraw:{}:{}", ticket_id, draw_id)
}

fn draw_index_key(draw_id: Uuid, ticket_id: Uuid) -> String {
    format!("ticketdraw_by_draw:{}:{}", draw_id, ticket_id)
}

pub fn load<R: KvRead + ?Sized>(reader: &R, id: Uuid) -> LotteryResult<Option<Ticket>> {
    load_json(reader, ticket_key(id).as_bytes())
}

pub fn require<R: KvRead + ?Sized>(reader: &R, id: Uuid) -> LotteryResult<Ticket> {
    load(reader, id)?.ok_or(LotteryError::TicketNotFound(id))
}

pub fn stage(tx: &mut StoreTransaction<'_>, ticket: &Ticket) -> LotteryResult<()> {
    stage_json(tx, ticket_key(ticket.id), ticket)
}

pub fn load_participation<R: KvRead + ?Sized>(
    reader: &R,
    ticket_id: Uuid,
    draw_id: Uuid,
) -> LotteryResult<Option<TicketDraw>> {
    load_json(reader, participation_key(ticket_id, draw_id).as_bytes())
}

pub fn stage_participation(tx: &mut StoreTransaction<'_>, participation: &TicketDraw) -> LotteryResult<()> {
    stage_json(
        tx,
        participation_key(participation.ticket_id, participation.draw_id),
        participation,
    )?;
    stage_json(
        tx,
        draw_index_key(participation.draw_id, participation.ticket_id),
        &participation.ticket_id,
    )
}

pub fn participations_for_ticket<R: KvRead + ?Sized>(
    reader: &R,
    ticket_id: Uuid,
) -> LotteryResult<Vec<TicketDraw>> {
    scan_json(reader, format!("ticketdraw:{}:", ticket_id).as_bytes())
}

/// Ids of every ticket bound to a draw, in id order
pub fn ticket_ids_for_draw<R: KvRead + ?Sized>(reader: &R, draw_id: Uuid) -> LotteryResult<Vec<Uuid>> {
    scan_json(reader, format!("ticketdraw_by_draw:{}:", draw_id).as_bytes())
}
