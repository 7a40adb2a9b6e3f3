//! Source extractors
//!
//! One [`PageRules`] implementation per platform, each wrapped in a
//! [`PlatformExtractor`] and collected in priority order for the
//! [`arbiter`].

pub mod arbiter;
mod page;

mod aladin;
mod joara;
mod kakao_page;
mod kyobo;
mod mrblue;
mod munpia;
mod naver_series;
mod novelnet;
mod novelpia;
mod ridibooks;
mod webtoonguide;
mod yes24;

pub use aladin::Aladin;
pub use arbiter::{remap_by_title, Remap, SourceArbiter};
pub use joara::Joara;
pub use kakao_page::KakaoPage;
pub use kyobo::Kyobo;
pub use mrblue::Mrblue;
pub use munpia::Munpia;
pub use naver_series::NaverSeries;
pub use novelnet::Novelnet;
pub use novelpia::Novelpia;
pub use page::{
    element_text, json_ld_genres, meta_contents, page_text, ExtractorContext, GenreSignal,
    PageContext, PageRules, PlatformExtractor,
};
pub use ridibooks::Ridibooks;
pub use webtoonguide::Webtoonguide;
pub use yes24::Yes24;

use crate::types::{SourceExtractor, SourceId};
use std::sync::Arc;

/// Extractor for one platform
pub fn extractor_for(source: SourceId, ctx: &ExtractorContext) -> Arc<dyn SourceExtractor> {
    let ctx = ctx.clone();
    match source {
        SourceId::Ridibooks => Arc::new(PlatformExtractor::new(Ridibooks, ctx)),
        SourceId::Munpia => Arc::new(PlatformExtractor::new(Munpia, ctx)),
        SourceId::NaverSeries => Arc::new(PlatformExtractor::new(NaverSeries, ctx)),
        SourceId::KakaoPage => Arc::new(PlatformExtractor::new(KakaoPage, ctx)),
        SourceId::Novelnet => Arc::new(PlatformExtractor::new(Novelnet, ctx)),
        SourceId::Novelpia => Arc::new(PlatformExtractor::new(Novelpia, ctx)),
        SourceId::Joara => Arc::new(PlatformExtractor::new(Joara, ctx)),
        SourceId::Webtoonguide => Arc::new(PlatformExtractor::new(Webtoonguide, ctx)),
        SourceId::Mrblue => Arc::new(PlatformExtractor::new(Mrblue, ctx)),
        SourceId::Kyobo => Arc::new(PlatformExtractor::new(Kyobo, ctx)),
        SourceId::Yes24 => Arc::new(PlatformExtractor::new(Yes24, ctx)),
        SourceId::Aladin => Arc::new(PlatformExtractor::new(Aladin, ctx)),
    }
}

/// All twelve extractors in priority order
pub fn default_extractors(ctx: &ExtractorContext) -> Vec<Arc<dyn SourceExtractor>> {
    SourceId::ALL
        .into_iter()
        .map(|source| extractor_for(source, ctx))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::MockFetcher;
    use crate::fetch::{CircuitBreakers, FetchGuard};
    use crate::matcher::TitleMatcher;
    use crate::vocabulary::GenreVocabulary;
    use std::time::Duration;

    #[test]
    fn test_default_extractors_cover_all_sources_in_order() {
        let ctx = ExtractorContext {
            guard: Arc::new(FetchGuard::new(
                Arc::new(MockFetcher::new()),
                Arc::new(CircuitBreakers::new()),
                Duration::ZERO,
            )),
            matcher: Arc::new(TitleMatcher::default()),
            vocabulary: Arc::new(GenreVocabulary::builtin()),
            max_pages: 3,
        };

        let sources: Vec<SourceId> = default_extractors(&ctx).iter().map(|e| e.source()).collect();

        assert_eq!(sources, SourceId::ALL.to_vec());
    }
}
