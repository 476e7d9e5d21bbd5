mod extract;
mod logging;
mod split;
mod state;
mod validate;
