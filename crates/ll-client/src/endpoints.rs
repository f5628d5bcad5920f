//! Endpoint descriptors for the call sites the client ships with.

use ll_core::HttpMethod;

/// Game-id placeholder used by admin endpoint templates.
pub const GAME_ID_PLACEHOLDER: &str = "#GAMEID#";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    /// Path template; `{0}`, `{1}`, ... are positional arguments.
    pub path: &'static str,
    pub method: HttpMethod,
}

impl Endpoint {
    pub const fn new(path: &'static str, method: HttpMethod) -> Self {
        Self { path, method }
    }

    /// Fill the positional `{n}` slots with `args`.
    pub fn with_args(&self, args: &[&str]) -> String {
        args.iter()
            .enumerate()
            .fold(self.path.to_string(), |path, (idx, arg)| {
                path.replace(&format!("{{{idx}}}"), arg)
            })
    }

    /// Substitute the game id placeholder.
    pub fn for_game(&self, game_id: u64) -> String {
        self.path.replace(GAME_ID_PLACEHOLDER, &game_id.to_string())
    }
}

pub const GUEST_SESSION: Endpoint = Endpoint::new("v2/session/guest", HttpMethod::Post);
pub const WHITE_LABEL_SESSION: Endpoint =
    Endpoint::new("v2/session/white-label", HttpMethod::Post);
/// Device-id session used by console platforms.
pub const DEVICE_SESSION: Endpoint = Endpoint::new("v2/session", HttpMethod::Post);
pub const END_SESSION: Endpoint = Endpoint::new("v1/session", HttpMethod::Delete);
pub const PLAYER_INFO: Endpoint = Endpoint::new("v1/player/info", HttpMethod::Get);
pub const LEADERBOARD_LIST: Endpoint =
    Endpoint::new("v1/leaderboards/{0}/list", HttpMethod::Get);
pub const SUBMIT_SCORE: Endpoint = Endpoint::new("v1/leaderboards/{0}/submit", HttpMethod::Post);
pub const ADMIN_CREATE_LEADERBOARD: Endpoint =
    Endpoint::new("game/#GAMEID#/leaderboards", HttpMethod::Post);
