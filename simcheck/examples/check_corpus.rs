use simcheck::{CheckConfig, Checker, Document};

fn main() {
    let documents = vec![
        Document::new(
            "alice",
            "Welcome to Jimbocho, the town of books and curry!",
            "def greet(name):\n    return 'hello ' + name",
        ),
        Document::new(
            "bob",
            "Welcome to Jimbocho, the city of books and curry!",
            "# says hello\ndef greet(name):\n    return 'hello ' + name",
        ),
        Document::new(
            "carol",
            "Kanda is famous for its secondhand bookstores.",
            "for i in range(10):\n    print(i * i)",
        ),
    ];

    // Keeps every feature, since pruning by document frequency is too strict for a tiny corpus.
    let config = CheckConfig::default().workers(2).document_frequency(0., 1.);
    let checker = Checker::new(config).unwrap();
    let report = checker.check(&documents).unwrap();

    println!("name,text,code");
    for score in report.scores() {
        println!("{},{:.2},{:.2}", score.name, score.text_score, score.code_score);
    }
}
