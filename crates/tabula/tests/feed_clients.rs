//! Feed clients driven end to end through the facade against canned bodies.

use tabula::{
    ApiCredentials, FeedWindow, FixtureTransport, GeocodeClient, JoinHow, MergeSpec,
    QuakeFeedClient, Scalar, SocialFeedClient, merge,
};

#[test]
fn quake_feed_merges_against_a_local_severity_table() {
    let transport = FixtureTransport::new();
    transport
        .register(
            "https://quake.test/all_week.geojson",
            r#"{"features": [
                {"id": "q1", "properties": {"mag": 6.1, "place": "offshore", "time": 0, "tsunami": 1},
                 "geometry": {"coordinates": [10.0, 20.0, 30.0]}},
                {"id": "q2", "properties": {"mag": 2.0, "place": "inland", "time": 0, "tsunami": 0},
                 "geometry": {"coordinates": [11.0, 21.0, 5.0]}}
            ]}"#,
        )
        .expect("register");

    let quakes = QuakeFeedClient::new(transport)
        .with_base_url("https://quake.test")
        .fetch(FeedWindow::PastWeek)
        .expect("fetch");

    let severity = tabula::DataFrame::from_pairs(vec![
        ("tsunami", vec![Scalar::Int64(0), Scalar::Int64(1)]),
        ("alert", vec![Scalar::from("watch"), Scalar::from("warning")]),
    ])
    .expect("severity");

    let out = merge(&quakes, &severity, &MergeSpec::on(JoinHow::Left, "tsunami")).expect("merge");
    assert_eq!(out.len(), 2);
    assert_eq!(
        out.column("alert").expect("alert").values(),
        &[Scalar::from("warning"), Scalar::from("watch")]
    );
}

#[test]
fn geocode_and_timeline_clients_share_the_transport_seam() {
    let transport = FixtureTransport::new();
    transport
        .register(
            "https://geo.test/find",
            r#"{"candidates": [{"address": "Austin, Texas", "location": {"x": -97.7, "y": 30.3}, "score": 99.0}]}"#,
        )
        .expect("register geocode");
    transport
        .register(
            "https://social.test/timeline",
            r#"[{"id": 1, "created_at": "now", "text": "hi", "retweet_count": 0, "favorite_count": 2}]"#,
        )
        .expect("register timeline");

    let places = GeocodeClient::new(transport.clone())
        .with_endpoint("https://geo.test/find")
        .geocode("Austin", 1)
        .expect("geocode");
    assert_eq!(
        places.column("label").expect("label").values(),
        &[Scalar::from("Austin, Texas")]
    );

    let credentials = ApiCredentials::from_json_str(
        r#"{"consumer_key": "ck", "consumer_secret": "cs",
            "access_token": "at", "access_token_secret": "ats"}"#,
    )
    .expect("credentials");
    let posts = SocialFeedClient::new(transport, credentials)
        .with_endpoints("https://social.test/timeline", "https://social.test/stream")
        .user_timeline("someone", 1)
        .expect("timeline");
    assert_eq!(posts.column("text").expect("text").values(), &[Scalar::from("hi")]);
}
