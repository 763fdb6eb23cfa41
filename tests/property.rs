mod property {
    mod accessor;
    mod aggregate;
    mod path;
}
