use std::fmt;
use std::str::FromStr;

/// The three views selectable from the sidebar menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Page {
    #[default]
    Home,
    Charts,
    Map,
}

impl Page {
    pub const ALL: [Page; 3] = [Page::Home, Page::Charts, Page::Map];

    pub fn path(self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::Charts => "/charts",
            Page::Map => "/map",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::Charts => "charts",
            Page::Map => "map",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::Charts => "Gráficos",
            Page::Map => "Mapa",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Page::Home => "🏠",
            Page::Charts => "📈",
            Page::Map => "🗺",
        }
    }

    /// Output file name when pages are exported as static HTML.
    pub fn file_name(self) -> &'static str {
        match self {
            Page::Home => "index.html",
            Page::Charts => "charts.html",
            Page::Map => "map.html",
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPage(pub String);

impl fmt::Display for UnknownPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown page '{}'", self.0)
    }
}

impl std::error::Error for UnknownPage {}

impl FromStr for Page {
    type Err = UnknownPage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "home" | "" => Ok(Page::Home),
            "charts" | "graficos" | "gráficos" => Ok(Page::Charts),
            "map" | "mapa" => Ok(Page::Map),
            _ => Err(UnknownPage(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pages_parse_from_slugs_and_titles() {
        for page in Page::ALL {
            assert_eq!(page.slug().parse::<Page>(), Ok(page));
            assert_eq!(page.title().parse::<Page>(), Ok(page));
        }
        assert!("relatorio".parse::<Page>().is_err());
    }

    #[test]
    fn paths_are_distinct() {
        let mut paths: Vec<_> = Page::ALL.iter().map(|p| p.path()).collect();
        paths.dedup();
        assert_eq!(paths.len(), 3);
        assert_eq!(Page::default(), Page::Home);
    }
}
