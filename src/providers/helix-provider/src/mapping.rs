use crate::models::{Follow, Game, SearchChannel, Stream, User};
use twitchy_core::api::TokenInfo;
use twitchy_core::models::{
    Channel, FollowedUser, Game as CoreGame, LiveStatus, Stream as CoreStream,
};

pub fn map_game(game: Game) -> CoreGame {
    CoreGame {
        id: game.id,
        name: game.name,
        box_art_url: game.box_art_url,
    }
}

pub fn map_stream(stream: Stream) -> CoreStream {
    CoreStream {
        id: stream.id,
        user_id: stream.user_id,
        user_login: stream.user_login,
        user_name: stream.user_name,
        game_name: stream.game_name,
        title: stream.title,
        viewer_count: stream.viewer_count,
        thumbnail_url: stream.thumbnail_url,
    }
}

pub fn map_follow(follow: Follow) -> FollowedUser {
    FollowedUser {
        id: follow.broadcaster_id,
        login: follow.broadcaster_login,
        display_name: follow.broadcaster_name,
        followed_at: follow.followed_at,
    }
}

pub fn live_status(stream: &Stream) -> LiveStatus {
    LiveStatus {
        game: stream.game_name.clone(),
        viewers: stream.viewer_count,
        title: stream.title.clone(),
    }
}

pub fn map_user(user: User, stream: Option<&Stream>) -> Channel {
    Channel {
        id: user.id,
        login: user.login,
        display_name: user.display_name,
        description: user.description,
        logo_url: user.profile_image_url.filter(|u| !u.is_empty()),
        views: user.view_count,
        live: stream.map(live_status),
    }
}

/// Search hits carry less than `users` does; fill in what the hit has and let
/// the user record win when present.
pub fn map_search_hit(hit: SearchChannel, user: Option<User>, stream: Option<&Stream>) -> Channel {
    if let Some(user) = user {
        let mut channel = map_user(user, stream);
        if channel.live.is_none() && hit.is_live {
            channel.live = Some(LiveStatus {
                game: hit.game_name,
                viewers: 0,
                title: hit.title,
            });
        }
        return channel;
    }

    let live = match stream {
        Some(stream) => Some(live_status(stream)),
        None if hit.is_live => Some(LiveStatus {
            game: hit.game_name,
            viewers: 0,
            title: hit.title.clone(),
        }),
        None => None,
    };
    Channel {
        id: hit.id,
        login: hit.broadcaster_login,
        display_name: hit.display_name,
        description: String::new(),
        logo_url: hit.thumbnail_url.filter(|u| !u.is_empty()),
        views: 0,
        live,
    }
}

pub fn map_token_info(info: crate::models::ValidateResponse) -> TokenInfo {
    TokenInfo {
        client_id: info.client_id,
        login: info.login,
        expires_in: info.expires_in,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(live: bool) -> SearchChannel {
        SearchChannel {
            id: "7".into(),
            broadcaster_login: "speedy".into(),
            display_name: "Speedy".into(),
            game_name: "Celeste".into(),
            is_live: live,
            thumbnail_url: Some("https://cdn/logo.png".into()),
            title: "any%".into(),
        }
    }

    #[test]
    fn search_hit_without_user_keeps_hit_fields() {
        let channel = map_search_hit(hit(true), None, None);
        assert_eq!(channel.login, "speedy");
        assert_eq!(channel.logo_url.as_deref(), Some("https://cdn/logo.png"));
        let live = channel.live.expect("live");
        assert_eq!(live.game, "Celeste");
        assert_eq!(live.viewers, 0);
    }

    #[test]
    fn user_record_wins_over_hit() {
        let user = User {
            id: "7".into(),
            login: "speedy".into(),
            display_name: "Speedy".into(),
            description: "runs games fast".into(),
            profile_image_url: Some(String::new()),
            view_count: 99,
        };
        let channel = map_search_hit(hit(false), Some(user), None);
        assert_eq!(channel.description, "runs games fast");
        assert_eq!(channel.views, 99);
        assert_eq!(channel.logo_url, None);
        assert!(channel.live.is_none());
    }
}
