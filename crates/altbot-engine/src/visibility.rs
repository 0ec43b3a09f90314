use altbot_social::Visibility;

/// Effective reply visibility for a configured intent and the visibility of
/// the post being replied to.
///
/// The result is never wider than either input. Without a configured intent
/// the target's own visibility is used.
pub fn resolve(configured: Option<Visibility>, target: Visibility) -> Visibility {
    use Visibility::*;

    let Some(configured) = configured else {
        return target;
    };

    match (configured, target) {
        (Public, Public) => Public,
        (Public, Unlisted) => Unlisted,
        (Public, Private) => Private,
        (Public, Direct) => Direct,

        (Unlisted, Public) => Unlisted,
        (Unlisted, Unlisted) => Unlisted,
        (Unlisted, Private) => Private,
        (Unlisted, Direct) => Direct,

        (Private, Public) => Private,
        (Private, Unlisted) => Private,
        (Private, Private) => Private,
        (Private, Direct) => Direct,

        (Direct, Public) => Direct,
        (Direct, Unlisted) => Direct,
        (Direct, Private) => Direct,
        (Direct, Direct) => Direct,
    }
}
