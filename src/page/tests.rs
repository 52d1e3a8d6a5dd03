use std::sync::{Arc, Weak};

use super::*;
use crate::content::{ContentPath, DefaultFrontMatterParser, FrontMatterParser};
use crate::language::{LanguageSpec, Languages};

const TAXONOMIES: &[&str] = &["categories", "tags"];

fn languages() -> Languages {
    Languages::register(
        vec![LanguageSpec::new("en", 1), LanguageSpec::new("fr", 2)],
        None,
        false,
    )
    .unwrap()
}

fn page(langs: &Languages, lang: &str, path: &str, content: &str) -> Page {
    let parsed = DefaultFrontMatterParser.parse(content.as_bytes()).unwrap();
    let path = ContentPath::parse(path, &langs.codes());
    Page::from_source(
        path,
        langs.by_code(lang).unwrap().clone(),
        parsed,
        TAXONOMIES,
        None,
    )
}

#[test]
fn test_regular_page() {
    let langs = languages();
    let p = page(&langs, "en", "sect/doc1.md", "---\ntitle: Doc One\n---\nbody");
    assert_eq!(p.kind(), PageKind::Page);
    assert_eq!(p.sections(), ["sect"]);
    assert_eq!(p.translation_key(), "sect/doc1");
    assert_eq!(p.permalink().as_str(), "/sect/doc1/");
    assert_eq!(p.outputs(), [OutputFormat::Html]);
    assert_eq!(p.title(), "Doc One");
    assert_eq!(p.source_ref(), "sect/doc1.md");
    assert!(!p.is_structural());
}

#[test]
fn test_translation_key_matches_across_languages() {
    let langs = languages();
    let en = page(&langs, "en", "sect/doc1.en.md", "");
    let fr = page(&langs, "fr", "sect/doc1.fr.md", "");
    assert_eq!(en.translation_key(), fr.translation_key());
    assert_eq!(en.permalink().as_str(), "/sect/doc1/");
    assert_eq!(fr.permalink().as_str(), "/fr/sect/doc1/");
}

#[test]
fn test_explicit_translation_key() {
    let langs = languages();
    let p = page(&langs, "fr", "a-propos.md", "---\ntranslationKey: about\n---\n");
    assert_eq!(p.translation_key(), "about");
}

#[test]
fn test_branch_kinds() {
    let langs = languages();
    assert_eq!(page(&langs, "en", "_index.md", "").kind(), PageKind::Home);
    assert_eq!(page(&langs, "en", "blog/_index.md", "").kind(), PageKind::Section);

    let listing = page(&langs, "en", "tags/_index.md", "");
    assert_eq!(listing.kind(), PageKind::TaxonomyTerm);
    assert_eq!(listing.translation_key(), "taxonomy/tags");
    assert_eq!(listing.permalink().as_str(), "/tags/");

    let term = page(&langs, "en", "tags/Rust Lang/_index.md", "");
    assert_eq!(term.kind(), PageKind::Taxonomy);
    assert_eq!(term.translation_key(), "term/tags/rust-lang");
    assert_eq!(term.permalink().as_str(), "/tags/rust-lang/");
}

#[test]
fn test_leaf_bundle() {
    let langs = languages();
    let p = page(&langs, "en", "blog/my-post/index.md", "")
        .with_resources(None, vec!["blog/my-post/b.png".into(), "blog/my-post/img/a.png".into()]);
    assert_eq!(p.kind(), PageKind::Page);
    assert_eq!(p.sections(), ["blog"]);
    assert_eq!(p.translation_key(), "blog/my-post");
    assert_eq!(p.permalink().as_str(), "/blog/my-post/");
    assert_eq!(p.title(), "my-post");
    assert!(p.is_bundle());
    assert_eq!(p.resources(), ["blog/my-post/b.png", "blog/my-post/img/a.png"]);
    assert_eq!(p.resource_root(), None);
    assert_eq!(p.resource_name("blog/my-post/img/a.png"), Some("img/a.png"));
    assert_eq!(
        p.resource_output("blog/my-post/img/a.png").as_deref(),
        Some("blog/my-post/img/a.png")
    );
    assert_eq!(p.resource_output("blog/other/a.png"), None);
}

#[test]
fn test_slug_and_url_overrides() {
    let langs = languages();
    let slugged = page(&langs, "fr", "sect/doc1.md", "---\nslug: Premier Doc\n---\n");
    assert_eq!(slugged.permalink().as_str(), "/fr/sect/premier-doc/");

    let url = page(&langs, "en", "sect/doc1.md", "---\nurl: /custom/place\n---\n");
    assert_eq!(url.permalink().as_str(), "/custom/place/");
}

#[test]
fn test_outputs_override_and_headless() {
    let langs = languages();
    let p = page(&langs, "en", "sect/doc1.md", "---\noutputs: [html, rss]\n---\n");
    assert_eq!(p.outputs(), [OutputFormat::Html, OutputFormat::Rss]);

    let headless = page(&langs, "en", "sect/doc2.md", "---\nheadless: true\n---\n");
    assert!(headless.outputs().is_empty());
    assert!(headless.is_headless());
}

#[test]
fn test_structural_pages() {
    let langs = languages();
    let fr = langs.by_code("fr").unwrap().clone();

    let home = Page::structural(PageKind::Home, fr.clone(), Vec::new(), None, "Site");
    assert!(home.is_structural());
    assert_eq!(home.source_ref(), "");
    assert_eq!(home.title(), "Site");
    assert_eq!(home.permalink().as_str(), "/fr/");
    assert_eq!(home.translation_key(), "home");

    let section = Page::structural(
        PageKind::Section,
        fr.clone(),
        vec!["my-posts".into()],
        None,
        "Site",
    );
    assert_eq!(section.title(), "My posts");
    assert_eq!(section.translation_key(), "section/my-posts");

    let not_found = Page::structural(PageKind::NotFound, fr, Vec::new(), None, "Site");
    assert_eq!(not_found.permalink().as_str(), "/fr/404.html");
}

#[test]
fn test_fingerprint_tracks_front_matter() {
    let langs = languages();
    let a = page(&langs, "en", "a.md", "---\ntitle: A\n---\none");
    let b = page(&langs, "en", "a.md", "---\ntitle: A\n---\ntwo");
    let c = page(&langs, "en", "a.md", "---\ntitle: B\n---\none");
    assert_eq!(a.meta_fingerprint(), b.meta_fingerprint());
    assert_ne!(a.meta_fingerprint(), c.meta_fingerprint());
}

#[test]
fn test_translations_hold_weak_refs() {
    let langs = languages();
    let en: PageRef = Arc::new(page(&langs, "en", "a.md", ""));
    let fr: PageRef = Arc::new(page(&langs, "fr", "a.fr.md", ""));
    en.set_translations(vec![Arc::downgrade(&fr)]);
    assert_eq!(en.translations().len(), 1);

    drop(fr);
    assert!(en.translations().is_empty());
    en.set_translations(vec![Weak::new()]);
    assert!(en.translations().is_empty());
}

#[test]
fn test_default_sort_order() {
    let langs = languages();
    let mut pages: Vec<PageRef> = vec![
        Arc::new(page(&langs, "en", "c.md", "---\ndate: 2024-01-01\n---\n")),
        Arc::new(page(&langs, "en", "b.md", "---\ndate: 2024-06-01\n---\n")),
        Arc::new(page(&langs, "en", "a.md", "---\nweight: 2\n---\n")),
        Arc::new(page(&langs, "en", "z.md", "---\nweight: 1\n---\n")),
    ];
    sort_pages(&mut pages);
    let order: Vec<_> = pages.iter().map(|p| p.source_ref()).collect();
    assert_eq!(order, vec!["z.md", "a.md", "b.md", "c.md"]);
}

#[test]
fn test_content_slot_written_once() {
    let langs = languages();
    let p = page(&langs, "en", "a.md", "body");
    assert!(p.content().is_none());
    let first = p
        .content_slot()
        .get_or_try_init(|| {
            Ok::<_, ()>(PageContent {
                word_count: 1,
                ..PageContent::default()
            })
        })
        .unwrap();
    let second = p
        .content_slot()
        .get_or_try_init(|| Ok::<_, ()>(PageContent::default()))
        .unwrap();
    assert_eq!(first.word_count, 1);
    assert_eq!(second.word_count, 1);
}
