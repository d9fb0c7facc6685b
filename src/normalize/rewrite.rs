use crate::types::Span;

/// One planned replacement in the canonicalized Markdown.
#[derive(Debug, Clone)]
pub(crate) struct RewriteTarget {
    pub span: Span,
    pub canonical: String,
    pub entity_id: String,
}

impl RewriteTarget {
    /// `||canonical||id||`. The canonical text may never contain a literal
    /// `||`; any produced by normalization collapses to a single pipe.
    fn marker(&self) -> String {
        let safe = self.canonical.replace("||", "|");
        format!("||{}||{}||", safe, self.entity_id)
    }
}

/// Replace every winning target span with its canonical marker.
///
/// Overlapping targets arise when a nested mention was merged into its
/// container (a bare year inside a regulation citation): the longest span
/// wins and the nested one is skipped. Replacement is applied from the
/// highest start downward so earlier byte offsets stay valid throughout.
pub(crate) fn rewrite_markdown(markdown: &str, mut targets: Vec<RewriteTarget>) -> String {
    // Pick winners: longest span first, then earliest start.
    targets.sort_by(|a, b| {
        b.span
            .len()
            .cmp(&a.span.len())
            .then(a.span.start.cmp(&b.span.start))
    });
    let mut accepted: Vec<RewriteTarget> = Vec::with_capacity(targets.len());
    for target in targets {
        if accepted.iter().all(|t| !t.span.overlaps(&target.span)) {
            accepted.push(target);
        }
    }

    accepted.sort_by(|a, b| b.span.start.cmp(&a.span.start));
    let mut out = markdown.to_string();
    for target in &accepted {
        out.replace_range(target.span.start..target.span.end, &target.marker());
    }
    out
}
