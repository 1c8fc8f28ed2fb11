/// Shared formatting helpers (alert templates, block names, durations).
pub mod formatting;

/// Single source of truth for the admin console command prefix.
pub const COMMAND_PREFIX: char = '/';
