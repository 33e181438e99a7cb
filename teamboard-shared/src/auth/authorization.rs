/// Resource-level access rules
///
/// The gate only establishes who is calling. Handlers re-check access to the
/// specific resource they touch with these helpers.
///
/// | Resource | Read / write          | Share      |
/// |----------|-----------------------|------------|
/// | Board    | owner or member       | owner only |

use crate::models::board::Board;

use super::gate::Principal;

/// Resource access failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AccessError {
    #[error("Forbidden")]
    Forbidden,

    #[error("Only owner can share")]
    NotOwner,
}

/// Whether `user_id` may read or write the board
pub fn can_access_board(board: &Board, user_id: &str) -> bool {
    board.owner == user_id || board.members.iter().any(|m| m == user_id)
}

pub fn ensure_board_access(board: &Board, principal: &Principal) -> Result<(), AccessError> {
    if can_access_board(board, &principal.id) {
        Ok(())
    } else {
        Err(AccessError::Forbidden)
    }
}

/// Only the owner may add members
pub fn ensure_board_owner(board: &Board, principal: &Principal) -> Result<(), AccessError> {
    if board.owner == principal.id {
        Ok(())
    } else {
        Err(AccessError::NotOwner)
    }
}
