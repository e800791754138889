// tests/web_tests.rs

mod common;

use common::{PASSWORD, location, spawn_app};
use inkpost::db::{comments, follows, posts, users};

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = reqwest::get(app.url("/random_path_that_does_not_exist"))
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn index_greets_strangers() {
    let app = spawn_app().await;

    let response = reqwest::get(app.url("/")).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
    let html = response.text().await.unwrap();
    assert!(html.contains("Hello, Stranger!"));
    assert!(!html.contains("<textarea"));
}

#[tokio::test]
async fn huge_page_numbers_render_an_empty_index() {
    let app = spawn_app().await;
    let john = app.create_user("john@example.com", "john", true).await;
    posts::create(&app.pool, john.id, "the only post").await.unwrap();

    for page in ["1000000000000000000", "9223372036854775807"] {
        let response = reqwest::get(app.url(&format!("/?page={page}"))).await.unwrap();
        assert_eq!(response.status().as_u16(), 200, "{page}");
        let html = response.text().await.unwrap();
        assert!(!html.contains("the only post"), "{page}");
    }
}

#[tokio::test]
async fn register_confirm_and_post() {
    let app = spawn_app().await;
    let client = app.browser();

    // Register
    let response = client
        .post(app.url("/auth/register"))
        .form(&[
            ("email", "john@example.com"),
            ("username", "john"),
            ("password", PASSWORD),
            ("password2", PASSWORD),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/auth/login");

    let user = users::find_by_username(&app.pool, "john")
        .await
        .unwrap()
        .expect("user was created");
    assert!(!user.confirmed);
    assert!(follows::is_following(&app.pool, user.id, user.id).await.unwrap());

    // Log in
    let response = app.login(&client, "john").await;
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/");

    let html = client.get(app.url("/")).send().await.unwrap().text().await.unwrap();
    assert!(html.contains("Hello, john!"));
    assert!(html.contains("not confirmed"));

    // Confirm with the mailed link
    let email = app.wait_for_mail("john@example.com").await;
    let link = email
        .text
        .split_whitespace()
        .find(|w| w.starts_with("http://localhost/auth/confirm/"))
        .expect("mail carries a confirmation link");
    let path = link.trim_start_matches("http://localhost");

    let response = client.get(app.url(path)).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 303);
    let user = users::find_by_id(&app.pool, user.id).await.unwrap().unwrap();
    assert!(user.confirmed);

    // Publish a post
    let response = client
        .post(app.url("/"))
        .form(&[("body", "hello **world**")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);

    let html = client.get(app.url("/")).send().await.unwrap().text().await.unwrap();
    assert!(html.contains("<strong>world</strong>"));
}

#[tokio::test]
async fn registration_rejects_duplicates_and_bad_usernames() {
    let app = spawn_app().await;
    app.create_user("john@example.com", "john", true).await;
    let client = app.browser();

    let response = client
        .post(app.url("/auth/register"))
        .form(&[
            ("email", "john@example.com"),
            ("username", "john"),
            ("password", PASSWORD),
            ("password2", PASSWORD),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let html = response.text().await.unwrap();
    assert!(html.contains("Email already registered."));
    assert!(html.contains("Username already in use."));

    let response = client
        .post(app.url("/auth/register"))
        .form(&[
            ("email", "other@example.com"),
            ("username", "9lives"),
            ("password", PASSWORD),
            ("password2", "dog"),
        ])
        .send()
        .await
        .unwrap();
    let html = response.text().await.unwrap();
    assert!(html.contains("Usernames must have only letters"));
    assert!(html.contains("Passwords must match."));
    assert!(users::find_by_username(&app.pool, "9lives").await.unwrap().is_none());
}

#[tokio::test]
async fn wrong_password_is_reported_without_detail() {
    let app = spawn_app().await;
    app.create_user("john@example.com", "john", true).await;
    let client = app.browser();

    for username in ["john", "nobody"] {
        let response = client
            .post(app.url("/auth/login"))
            .form(&[("username", username), ("password", "dog")])
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
        let html = response.text().await.unwrap();
        assert!(html.contains("Invalid username or password."));
    }
}

#[tokio::test]
async fn login_required_pages_redirect_with_next() {
    let app = spawn_app().await;
    let client = app.browser();

    let response = client.get(app.url("/edit-profile")).send().await.unwrap();

    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/auth/login?next=%2Fedit-profile");
}

#[tokio::test]
async fn anonymous_visitors_cannot_post() {
    let app = spawn_app().await;

    let response = app
        .browser()
        .post(app.url("/"))
        .form(&[("body", "spam")])
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 403);
}

#[tokio::test]
async fn followed_feed_includes_own_posts() {
    let app = spawn_app().await;
    let john = app.create_user("john@example.com", "john", true).await;
    let susan = app.create_user("susan@example.com", "susan", true).await;
    posts::create(&app.pool, john.id, "my own words").await.unwrap();
    posts::create(&app.pool, susan.id, "susan speaks").await.unwrap();

    let client = app.browser();
    app.login(&client, "john").await;

    let response = client.get(app.url("/followed")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 303);

    let html = client.get(app.url("/")).send().await.unwrap().text().await.unwrap();
    assert!(html.contains("my own words"));
    assert!(!html.contains("susan speaks"));

    client.get(app.url("/all")).send().await.unwrap();
    let html = client.get(app.url("/")).send().await.unwrap().text().await.unwrap();
    assert!(html.contains("susan speaks"));
}

#[tokio::test]
async fn follow_and_unfollow() {
    let app = spawn_app().await;
    let john = app.create_user("john@example.com", "john", true).await;
    let susan = app.create_user("susan@example.com", "susan", true).await;
    let client = app.browser();
    app.login(&client, "john").await;

    let response = client.get(app.url("/follow/susan")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/user/susan");
    assert!(follows::is_following(&app.pool, john.id, susan.id).await.unwrap());

    let html = client
        .get(app.url("/user/susan"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("You are now following susan."));
    assert!(html.contains("Unfollow"));

    let html = reqwest::get(app.url("/followers/susan"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("/user/john"));

    client.get(app.url("/unfollow/susan")).send().await.unwrap();
    assert!(!follows::is_following(&app.pool, john.id, susan.id).await.unwrap());

    // The self-edge cannot be removed.
    client.get(app.url("/unfollow/john")).send().await.unwrap();
    assert!(follows::is_following(&app.pool, john.id, john.id).await.unwrap());
    let html = client.get(app.url("/user/john")).send().await.unwrap().text().await.unwrap();
    assert!(html.contains("You cannot unfollow yourself."));
}

#[tokio::test]
async fn unknown_user_listing_flashes_and_redirects() {
    let app = spawn_app().await;
    let client = app.browser();

    let response = client.get(app.url("/followers/ghost")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/");

    let html = client.get(app.url("/")).send().await.unwrap().text().await.unwrap();
    assert!(html.contains("Invalid user."));
}

#[tokio::test]
async fn unknown_profile_is_404() {
    let app = spawn_app().await;
    let response = reqwest::get(app.url("/user/ghost")).await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn only_author_or_admin_may_edit_a_post() {
    let app = spawn_app().await;
    let john = app.create_user("john@example.com", "john", true).await;
    app.create_user("susan@example.com", "susan", true).await;
    app.create_user("admin@example.com", "admin", true).await;
    let post = posts::create(&app.pool, john.id, "first draft").await.unwrap();

    let susan = app.browser();
    app.login(&susan, "susan").await;
    let response = susan
        .post(app.url(&format!("/edit/{}", post.id)))
        .form(&[("body", "vandalised")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let admin = app.browser();
    app.login(&admin, "admin").await;
    let response = admin
        .post(app.url(&format!("/edit/{}", post.id)))
        .form(&[("body", "*edited*")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);

    let post = posts::find(&app.pool, post.id).await.unwrap().unwrap();
    assert_eq!(post.body, "*edited*");
    assert!(post.body_html.contains("<em>edited</em>"));
}

#[tokio::test]
async fn comments_are_stripped_and_land_on_the_last_page() {
    let app = spawn_app().await;
    let john = app.create_user("john@example.com", "john", true).await;
    let post = posts::create(&app.pool, john.id, "a post").await.unwrap();
    let client = app.browser();
    app.login(&client, "john").await;

    let response = client
        .post(app.url(&format!("/post/{}", post.id)))
        .form(&[("body", "nice <span>hidden</span> post")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(
        location(&response),
        format!("/post/{}?page=-1#comments", post.id)
    );

    let page = comments::for_post(&app.pool, post.id, Default::default(), 15)
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert!(!page.items[0].body_html.contains("hidden"));

    let html = client
        .get(app.url(&format!("/post/{}?page=-1", post.id)))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("Your comment has been published."));
    assert!(html.contains("nice"));
}

#[tokio::test]
async fn moderators_disable_comments() {
    let app = spawn_app().await;
    let john = app.create_user("john@example.com", "john", true).await;
    app.create_user("admin@example.com", "admin", true).await;
    let post = posts::create(&app.pool, john.id, "a post").await.unwrap();
    let comment = comments::create(&app.pool, post.id, john.id, "rude words")
        .await
        .unwrap();

    let user = app.browser();
    app.login(&user, "john").await;
    let response = user
        .get(app.url(&format!("/moderate/disable/{}", comment.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let admin = app.browser();
    app.login(&admin, "admin").await;
    let response = admin
        .get(app.url(&format!("/moderate/disable/{}?page=2", comment.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/moderate?page=2");
    assert!(comments::find(&app.pool, comment.id).await.unwrap().unwrap().disabled);

    // Hidden from readers, visible to moderators.
    let html = user
        .get(app.url(&format!("/post/{}", post.id)))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("disabled by a moderator"));
    assert!(!html.contains("rude words"));

    let html = admin
        .get(app.url("/moderate"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert!(html.contains("rude words"));

    let response = admin
        .get(app.url("/moderate/enable/9999"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn profile_edit_updates_fields() {
    let app = spawn_app().await;
    let john = app.create_user("john@example.com", "john", true).await;
    let client = app.browser();
    app.login(&client, "john").await;

    let response = client
        .post(app.url("/edit-profile"))
        .form(&[("name", "John Smith"), ("location", "Leeds"), ("about_me", "")])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);

    let john = users::find_by_id(&app.pool, john.id).await.unwrap().unwrap();
    assert_eq!(john.name.as_deref(), Some("John Smith"));
    assert_eq!(john.location.as_deref(), Some("Leeds"));
    assert_eq!(john.about_me, None);
}

#[tokio::test]
async fn admin_deletes_user_with_cascade() {
    let app = spawn_app().await;
    let admin = app.create_user("admin@example.com", "admin", true).await;
    let john = app.create_user("john@example.com", "john", true).await;
    posts::create(&app.pool, john.id, "soon gone").await.unwrap();
    follows::follow(&app.pool, admin.id, john.id).await.unwrap();

    let client = app.browser();
    app.login(&client, "admin").await;

    // Administrators cannot delete themselves.
    client
        .post(app.url(&format!("/edit-profile/{}/delete", admin.id)))
        .send()
        .await
        .unwrap();
    assert!(users::find_by_id(&app.pool, admin.id).await.unwrap().is_some());

    let response = client
        .post(app.url(&format!("/edit-profile/{}/delete", john.id)))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);

    assert!(users::find_by_id(&app.pool, john.id).await.unwrap().is_none());
    assert_eq!(users::post_count(&app.pool, john.id).await.unwrap(), 0);
    assert!(!follows::is_following(&app.pool, admin.id, john.id).await.unwrap());
}

#[tokio::test]
async fn admin_edit_checks_uniqueness() {
    let app = spawn_app().await;
    app.create_user("admin@example.com", "admin", true).await;
    let john = app.create_user("john@example.com", "john", false).await;
    app.create_user("susan@example.com", "susan", true).await;
    let role_id = john.role_id.expect("john has a role").to_string();

    let client = app.browser();
    app.login(&client, "admin").await;

    let response = client
        .post(app.url(&format!("/edit-profile/{}", john.id)))
        .form(&[
            ("email", "susan@example.com"),
            ("username", "john"),
            ("role", role_id.as_str()),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.text().await.unwrap().contains("Email already registered."));

    let response = client
        .post(app.url(&format!("/edit-profile/{}", john.id)))
        .form(&[
            ("email", "johnny@example.com"),
            ("username", "johnny"),
            ("confirmed", "on"),
            ("role", role_id.as_str()),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 303);
    assert_eq!(location(&response), "/user/johnny");

    let john = users::find_by_id(&app.pool, john.id).await.unwrap().unwrap();
    assert_eq!(john.email, "johnny@example.com");
    assert!(john.confirmed);
    assert_eq!(
        john.avatar_hash,
        inkpost::models::user::avatar_hash("johnny@example.com")
    );
}

#[tokio::test]
async fn logout_ends_the_session() {
    let app = spawn_app().await;
    app.create_user("john@example.com", "john", true).await;
    let client = app.browser();
    app.login(&client, "john").await;

    let response = client.get(app.url("/auth/logout")).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 303);

    let html = client.get(app.url("/")).send().await.unwrap().text().await.unwrap();
    assert!(html.contains("You have been logged out."));
    assert!(html.contains("Hello, Stranger!"));
}
