// ── Web link templates ──
//
// Sources attach links to third-party server pages. Game tables refer to
// templates by name, either for servers from one principal or for any.

use crate::model::WebLink;

/// A named link pattern. Supported placeholders: `{game}`, `{platform}`,
/// `{uid}`, `{ip}`, `{port}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkTemplate {
    pub site: &'static str,
    pub url: &'static str,
    pub official: bool,
}

const fn tpl(site: &'static str, url: &'static str, official: bool) -> LinkTemplate {
    LinkTemplate {
        site,
        url,
        official,
    }
}

/// Look up a template by reference name.
pub fn template(name: &str) -> Option<LinkTemplate> {
    let found = match name {
        "arena.sh" => tpl("arena.sh", "https://arena.sh/game/{ip}:{port}/", false),
        "battlelog" => tpl(
            "battlelog.com",
            "https://battlelog.battlefield.com/{game}/servers/show/{platform}/{uid}",
            true,
        ),
        "b2bf2" => tpl("b2bf2.net", "https://b2bf2.net/server?sid={ip}:{port}", true),
        "bf2.tv" => tpl("bf2.tv", "https://bf2.tv/servers/{ip}:{port}", false),
        "bf2hub" => tpl("bf2hub.com", "https://www.bf2hub.com/server/{ip}:{port}/", true),
        "cod.pm" => tpl("cod.pm", "https://cod.pm/server/{ip}/{port}", false),
        // deathmask.net mirrors other masters too, so it is only official
        // for servers it lists itself
        "deathmask.net-official" => tpl(
            "deathmask.net",
            "https://dpmaster.deathmask.net/?game={game}&server={ip}:{port}",
            true,
        ),
        "deathmask.net-unofficial" => tpl(
            "deathmask.net",
            "https://dpmaster.deathmask.net/?game={game}&server={ip}:{port}",
            false,
        ),
        "gametools" => tpl(
            "gametools.network",
            "https://gametools.network/servers/{game}/gameid/{uid}/{platform}",
            false,
        ),
        "swat4stats.com" => tpl(
            "swat4stats.com",
            "https://swat4stats.com/servers/{ip}:{port}/",
            false,
        ),
        _ => return None,
    };
    Some(found)
}

/// Values substituted into a template.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkContext<'a> {
    pub game: &'a str,
    pub platform: &'a str,
    pub uid: &'a str,
    pub ip: Option<&'a str>,
    pub port: Option<u16>,
}

impl LinkTemplate {
    pub fn render(&self, ctx: &LinkContext<'_>) -> WebLink {
        let port = ctx.port.map(|p| p.to_string()).unwrap_or_default();
        let url = self
            .url
            .replace("{game}", ctx.game)
            .replace("{platform}", ctx.platform)
            .replace("{uid}", ctx.uid)
            .replace("{ip}", ctx.ip.unwrap_or_default())
            .replace("{port}", &port);
        WebLink::new(self.site, url, self.official)
    }
}

/// Which templates a game links to.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkRefs {
    /// Links for servers from any principal.
    pub any: &'static [&'static str],
    /// Links only for servers reported by a specific principal.
    pub by_principal: &'static [(&'static str, &'static [&'static str])],
}

impl LinkRefs {
    pub const NONE: Self = Self {
        any: &[],
        by_principal: &[],
    };

    pub const fn any(refs: &'static [&'static str]) -> Self {
        Self {
            any: refs,
            by_principal: &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.any.is_empty() && self.by_principal.is_empty()
    }

    /// Principal-scoped references first, then the catch-all ones.
    pub fn for_principal<'a>(&'a self, principal: &'a str) -> impl Iterator<Item = &'static str> + 'a {
        self.by_principal
            .iter()
            .filter(move |(p, _)| *p == principal)
            .flat_map(|(_, refs)| refs.iter().copied())
            .chain(self.any.iter().copied())
    }

    pub fn render(&self, principal: &str, ctx: &LinkContext<'_>) -> Vec<WebLink> {
        render_refs(self.for_principal(principal), ctx)
    }
}

/// Render every known reference; unknown names are ignored.
pub fn render_refs<'r>(refs: impl IntoIterator<Item = &'r str>, ctx: &LinkContext<'_>) -> Vec<WebLink> {
    refs.into_iter()
        .filter_map(template)
        .map(|t| t.render(ctx))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const BF2: LinkRefs = LinkRefs {
        any: &["bf2.tv"],
        by_principal: &[("bf2hub.com", &["bf2hub"])],
    };

    fn ctx() -> LinkContext<'static> {
        LinkContext {
            game: "bf2",
            platform: "pc",
            uid: "abc",
            ip: Some("1.2.3.4"),
            port: Some(29900),
        }
    }

    #[test]
    fn principal_links_come_first() {
        let links = BF2.render("bf2hub.com", &ctx());
        let sites: Vec<_> = links.iter().map(|l| l.site.as_str()).collect();
        assert_eq!(sites, ["bf2hub.com", "bf2.tv"]);
        assert_eq!(links[0].url, "https://www.bf2hub.com/server/1.2.3.4:29900/");
        assert!(links[0].official);
    }

    #[test]
    fn other_principals_get_catch_all_only() {
        let links = BF2.render("openspy.net", &ctx());
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://bf2.tv/servers/1.2.3.4:29900");
    }

    #[test]
    fn renders_uid_templates() {
        let link = template("gametools").unwrap().render(&LinkContext {
            game: "bf1",
            platform: "pc",
            uid: "7001",
            ..LinkContext::default()
        });
        assert_eq!(link.url, "https://gametools.network/servers/bf1/gameid/7001/pc");
        assert!(template("battlefieldtracker").is_none());
    }
}
