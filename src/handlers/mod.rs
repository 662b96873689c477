// Handlers are grouped by what a caller needs to reach them:
// public (no token), protected (any valid session), elevated (global roles).
pub mod elevated;
pub mod protected;
pub mod public;
