//! Known social platforms and their canonical profile-URL prefixes.

/// Platform name and profile-URL prefix, in default search order.
const PLATFORMS: &[(&str, &str)] = &[
    ("facebook", "https://www.facebook.com/"),
    ("twitter", "https://twitter.com/"),
    ("instagram", "https://www.instagram.com/"),
    ("linkedin", "https://www.linkedin.com/company/"),
    ("youtube", "https://www.youtube.com/"),
    ("pinterest", "https://www.pinterest.com/"),
    ("tumblr", "https://www.tumblr.com/"),
    ("reddit", "https://www.reddit.com/user/"),
    ("flickr", "https://www.flickr.com/people/"),
    ("snapchat", "https://www.snapchat.com/add/"),
    ("whatsapp", "https://wa.me/"),
    ("telegram", "https://t.me/"),
    ("wechat", "https://weixin.qq.com/"),
    ("line", "https://line.me/R/ti/p/"),
    ("viber", "https://chats.viber.com/"),
    ("vk", "https://vk.com/"),
    ("tiktok", "https://www.tiktok.com/@"),
    ("soundcloud", "https://soundcloud.com/"),
    ("spotify", "https://open.spotify.com/user/"),
    ("medium", "https://medium.com/@"),
    ("quora", "https://www.quora.com/profile/"),
    ("twitch", "https://www.twitch.tv/"),
    ("behance", "https://www.behance.net/"),
    ("dribbble", "https://dribbble.com/"),
    ("deviantart", "https://www.deviantart.com/"),
    ("foursquare", "https://foursquare.com/"),
    ("goodreads", "https://www.goodreads.com/"),
    ("hackernews", "https://news.ycombinator.com/user?id="),
    ("producthunt", "https://www.producthunt.com/@"),
    ("tripadvisor", "https://www.tripadvisor.com/members/"),
    ("yelp", "https://www.yelp.com/user_details?userid="),
    ("wordpress", "https://profiles.wordpress.org/"),
    ("blogger", "https://www.blogger.com/profile/"),
    ("wix", "https://www.wix.com/dashboard/"),
    ("weebly", "https://www.weebly.com/editor/main.php#/site/"),
    ("jimdo", "https://www.jimdo.com/app/profile/"),
    ("squarespace", "https://www.squarespace.com/preview/"),
];

/// Static registry of social platforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct SocialPlatformRegistry;

impl SocialPlatformRegistry {
    /// Platform names in registry order.
    pub fn names() -> impl Iterator<Item = &'static str> {
        PLATFORMS.iter().map(|(name, _)| *name)
    }

    /// Number of registered platforms.
    #[must_use]
    pub fn len() -> usize {
        PLATFORMS.len()
    }

    /// Profile-URL prefix for a platform, looked up case-insensitively.
    #[must_use]
    pub fn prefix(name: &str) -> Option<&'static str> {
        PLATFORMS
            .iter()
            .find(|(platform, _)| platform.eq_ignore_ascii_case(name.trim()))
            .map(|(_, prefix)| *prefix)
    }

    /// Whether a platform is registered.
    #[must_use]
    pub fn contains(name: &str) -> bool {
        Self::prefix(name).is_some()
    }

    /// Platforms to search for a site by default.
    ///
    /// A platform is left out when the site's base URL is contained in its
    /// profile prefix, so a social network is not searched for itself.
    #[must_use]
    pub fn default_platforms_for(base_url: &str) -> Vec<String> {
        let base = base_url.trim().to_lowercase();
        PLATFORMS
            .iter()
            .filter(|(_, prefix)| base.is_empty() || !prefix.contains(base.as_str()))
            .map(|(name, _)| (*name).to_string())
            .collect()
    }
}
