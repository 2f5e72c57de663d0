macro_rules! assert_labels {
    ($diag:expr, [$($label:expr),* $(,)?]) => {{
        use miette::Diagnostic;

        let labels: Vec<String> = $diag
            .labels()
            .into_iter()
            .flatten()
            .filter_map(|span| span.label().map(ToOwned::to_owned))
            .collect();
        assert_eq!(labels, [$($label),*], "labels of {}", stringify!($diag));
    }};
}

pub(crate) use assert_labels;
