//! Active executor set stored as an arena plus reverse index
//!
//! `position -> address` and `address -> position` maps give O(1) membership,
//! lookup by index and removal. Removal moves the last member into the freed
//! slot and shrinks the set. Membership only changes during rollover, so
//! positions are stable for the whole epoch and round selection can index
//! into the set directly.

use cosmwasm_std::{Addr, Order, StdError, StdResult, Storage};
use cw_storage_plus::{Item, Map};

const ACTIVE_COUNT: Item<u32> = Item::new("active_count");
const ACTIVE_BY_POSITION: Map<u32, Addr> = Map::new("active_by_position");
const ACTIVE_POSITION: Map<&Addr, u32> = Map::new("active_position");

pub fn len(storage: &dyn Storage) -> StdResult<u32> {
    Ok(ACTIVE_COUNT.may_load(storage)?.unwrap_or_default())
}

pub fn contains(storage: &dyn Storage, addr: &Addr) -> bool {
    ACTIVE_POSITION.has(storage, addr)
}

pub fn get(storage: &dyn Storage, position: u32) -> StdResult<Addr> {
    ACTIVE_BY_POSITION.load(storage, position)
}

pub fn position(storage: &dyn Storage, addr: &Addr) -> StdResult<Option<u32>> {
    ACTIVE_POSITION.may_load(storage, addr)
}

/// Returns false when `addr` already is a member
pub fn insert(storage: &mut dyn Storage, addr: &Addr) -> StdResult<bool> {
    if contains(storage, addr) {
        return Ok(false);
    }

    let position = len(storage)?;
    ACTIVE_BY_POSITION.save(storage, position, addr)?;
    ACTIVE_POSITION.save(storage, addr, &position)?;
    ACTIVE_COUNT.save(storage, &(position + 1))?;
    Ok(true)
}

/// Swap-and-pop removal; returns false when `addr` is not a member
pub fn remove(storage: &mut dyn Storage, addr: &Addr) -> StdResult<bool> {
    let Some(position) = ACTIVE_POSITION.may_load(storage, addr)? else {
        return Ok(false);
    };

    let last = len(storage)?
        .checked_sub(1)
        .ok_or_else(|| StdError::generic_err("active set index out of sync"))?;

    if position != last {
        let moved = ACTIVE_BY_POSITION.load(storage, last)?;
        ACTIVE_BY_POSITION.save(storage, position, &moved)?;
        ACTIVE_POSITION.save(storage, &moved, &position)?;
    }

    ACTIVE_BY_POSITION.remove(storage, last);
    ACTIVE_POSITION.remove(storage, addr);
    ACTIVE_COUNT.save(storage, &last)?;
    Ok(true)
}

/// Members in position order, capped at `limit`
pub fn members(storage: &dyn Storage, limit: u32) -> StdResult<Vec<Addr>> {
    ACTIVE_BY_POSITION
        .range(storage, None, None, Order::Ascending)
        .take(limit as usize)
        .map(|item| item.map(|(_, addr)| addr))
        .collect()
}
