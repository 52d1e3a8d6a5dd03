//! Menus assembled from page front matter.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::page::PageRef;

#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub name: String,
    /// Site-relative URL of the target page.
    pub url: String,
    pub weight: i64,
    pub page: PageRef,
}

/// `menu name -> entries`, each menu ordered by weight then name.
#[derive(Debug, Clone, Default)]
pub struct Menus {
    menus: Arc<BTreeMap<String, Vec<MenuEntry>>>,
}

impl Menus {
    pub fn assemble(pages: &[PageRef]) -> Self {
        let mut menus: BTreeMap<String, Vec<MenuEntry>> = BTreeMap::new();
        for page in pages {
            for menu_ref in page.meta().menu_refs() {
                let entry = MenuEntry {
                    name: menu_ref.name.unwrap_or_else(|| page.link_title().to_string()),
                    url: page.permalink().as_str().to_string(),
                    weight: menu_ref.weight.unwrap_or_else(|| page.weight()),
                    page: page.clone(),
                };
                menus.entry(menu_ref.menu).or_default().push(entry);
            }
        }
        for entries in menus.values_mut() {
            entries.sort_by(|a, b| a.weight.cmp(&b.weight).then_with(|| a.name.cmp(&b.name)));
        }
        Self {
            menus: Arc::new(menus),
        }
    }

    pub fn get(&self, menu: &str) -> &[MenuEntry] {
        self.menus.get(menu).map_or(&[], Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.menus.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.menus.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::site::test_support::{language, page};

    #[test]
    fn test_menu_order_and_names() {
        let en = language("en");
        let pages = vec![
            page(&en, "b.md", "+++\ntitle = \"Beta\"\nmenu = \"main\"\n+++\n"),
            page(&en, "a.md", "+++\ntitle = \"Alpha\"\nmenu = [\"main\", \"footer\"]\n+++\n"),
            page(
                &en,
                "c.md",
                "+++\ntitle = \"Gamma\"\n[menu.main]\nname = \"First\"\nweight = -1\n+++\n",
            ),
            page(&en, "d.md", "+++\ntitle = \"None\"\n+++\n"),
        ];
        let menus = Menus::assemble(&pages);

        let main: Vec<_> = menus.get("main").iter().map(|e| e.name.as_str()).collect();
        assert_eq!(main, vec!["First", "Alpha", "Beta"]);
        assert_eq!(menus.get("footer").len(), 1);
        assert_eq!(menus.get("footer")[0].url, "/a/");
        assert!(menus.get("missing").is_empty());
        assert_eq!(menus.names().collect::<Vec<_>>(), vec!["footer", "main"]);
    }
}
