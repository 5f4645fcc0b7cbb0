fn main() {
    // snippet:start
    let greeting = "hello";
    if !greeting.is_empty() {
        println!("{greeting} world!");
    }
    // snippet:stop
}
